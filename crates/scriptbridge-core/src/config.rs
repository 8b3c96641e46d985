/// Options fixed when a [`State`](crate::State) is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Protect registered metatables from script inspection.
    ///
    /// When set, every companion table the registration layer creates
    /// carries a `__metatable` field of `false`, so asking for the
    /// metatable of a registered object or class yields `false`.
    pub hide_metatables: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hide_metatables: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hide_metatables(mut self, hide: bool) -> Self {
        self.hide_metatables = hide;
        self
    }
}
