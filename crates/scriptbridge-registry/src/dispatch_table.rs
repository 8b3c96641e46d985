//! Per-class member tables and inheritance-chain lookup.
//!
//! A [`DispatchTable`] holds one class's members in four categories:
//! methods, const methods, getters and setters. Tables link to their base
//! class's table, so a lookup that misses locally continues up the chain.
//! The same structure serves static members (functions, getters and
//! setters of the class itself) and namespace-level properties.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use log::trace;
use rustc_hash::FxHashMap;
use scriptbridge_core::TypeHash;

use crate::callable::Callable;

bitflags! {
    /// Member categories of a dispatch table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Categories: u8 {
        const METHOD = 1 << 0;
        const CONST_METHOD = 1 << 1;
        const GETTER = 1 << 2;
        const SETTER = 1 << 3;
    }
}

/// Converts a reference to a derived object into a reference to its base.
#[derive(Clone, Copy)]
pub struct Upcast {
    up_ref: fn(&dyn Any) -> Option<&dyn Any>,
    up_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

impl Upcast {
    /// Upcast from `D` to the `B` it embeds.
    pub fn of<D, B>() -> Self
    where
        D: AsRef<B> + AsMut<B> + 'static,
        B: 'static,
    {
        Self {
            up_ref: upcast_ref::<D, B>,
            up_mut: upcast_mut::<D, B>,
        }
    }
}

fn upcast_ref<D: AsRef<B> + 'static, B: 'static>(obj: &dyn Any) -> Option<&dyn Any> {
    obj.downcast_ref::<D>().map(|d| d.as_ref() as &dyn Any)
}

fn upcast_mut<D: AsMut<B> + 'static, B: 'static>(obj: &mut dyn Any) -> Option<&mut dyn Any> {
    obj.downcast_mut::<D>().map(|d| d.as_mut() as &mut dyn Any)
}

struct Parent {
    table: Rc<DispatchTable>,
    upcast: Option<Upcast>,
}

type MemberMap = RefCell<FxHashMap<String, Callable>>;

/// Member table for one class (or static scope, or namespace).
pub struct DispatchTable {
    name: String,
    type_hash: TypeHash,
    parent: Option<Parent>,
    methods: MemberMap,
    const_methods: MemberMap,
    getters: MemberMap,
    setters: MemberMap,
}

impl DispatchTable {
    /// Create a table with no base.
    pub fn new(name: impl Into<String>, type_hash: TypeHash) -> Self {
        Self {
            name: name.into(),
            type_hash,
            parent: None,
            methods: MemberMap::default(),
            const_methods: MemberMap::default(),
            getters: MemberMap::default(),
            setters: MemberMap::default(),
        }
    }

    /// Create a table whose misses continue in `base`.
    ///
    /// `upcast` converts objects of this class to the base's type; static
    /// tables pass `None`.
    pub fn derived(
        name: impl Into<String>,
        type_hash: TypeHash,
        base: Rc<DispatchTable>,
        upcast: Option<Upcast>,
    ) -> Self {
        Self {
            parent: Some(Parent {
                table: base,
                upcast,
            }),
            ..Self::new(name, type_hash)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    pub fn base(&self) -> Option<&Rc<DispatchTable>> {
        self.parent.as_ref().map(|p| &p.table)
    }

    fn map(&self, category: Categories) -> &MemberMap {
        if category == Categories::METHOD {
            &self.methods
        } else if category == Categories::CONST_METHOD {
            &self.const_methods
        } else if category == Categories::GETTER {
            &self.getters
        } else {
            &self.setters
        }
    }

    /// Install `callable` under `name` in every category of `categories`.
    ///
    /// An existing entry with the same name is replaced and released.
    pub fn set(&self, categories: Categories, name: &str, callable: Callable) {
        for category in categories.iter() {
            let previous = self
                .map(category)
                .borrow_mut()
                .insert(name.to_string(), callable.clone());
            if previous.is_some() {
                trace!("{}: replaced {:?} '{}'", self.name, category, name);
            }
        }
    }

    /// Look `name` up in this table only.
    pub fn get_local(&self, category: Categories, name: &str) -> Option<Callable> {
        self.map(category).borrow().get(name).cloned()
    }

    /// Look `name` up in one category, walking the base chain.
    pub fn get(&self, category: Categories, name: &str) -> Option<Callable> {
        let mut table = self;
        loop {
            if let Some(found) = table.get_local(category, name) {
                return Some(found);
            }
            table = &table.parent.as_ref()?.table;
        }
    }

    /// Resolve a field read.
    ///
    /// At each level of the chain, const methods are tried first, then
    /// (for mutable handles only) methods, then getters; the first hit
    /// wins. A name found in any category at a derived level therefore
    /// shadows the same name at every base level.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_field(&self, name: &str, is_const: bool) -> Option<Callable> {
        let mut table = self;
        loop {
            let local = table
                .get_local(Categories::CONST_METHOD, name)
                .or_else(|| {
                    if is_const {
                        None
                    } else {
                        table.get_local(Categories::METHOD, name)
                    }
                })
                .or_else(|| table.get_local(Categories::GETTER, name));
            if local.is_some() {
                return local;
            }
            table = &table.parent.as_ref()?.table;
        }
    }

    /// Number of entries in one category of this table.
    pub fn len(&self, category: Categories) -> usize {
        self.map(category).borrow().len()
    }

    /// True if `hash` names this class or one of its bases.
    pub fn is_derived_from(&self, hash: TypeHash) -> bool {
        let mut table = self;
        loop {
            if table.type_hash == hash {
                return true;
            }
            match &table.parent {
                Some(parent) => table = &parent.table,
                None => return false,
            }
        }
    }

    /// View `obj`, an object of this class, as a `U` somewhere up the chain.
    pub fn cast_ref<'a, U: 'static>(&self, obj: &'a dyn Any) -> Option<&'a U> {
        if let Some(found) = obj.downcast_ref::<U>() {
            return Some(found);
        }
        let parent = self.parent.as_ref()?;
        let base = (parent.upcast?.up_ref)(obj)?;
        parent.table.cast_ref::<U>(base)
    }

    /// Mutable counterpart of [`cast_ref`](Self::cast_ref).
    pub fn cast_mut<'a, U: 'static>(&self, obj: &'a mut dyn Any) -> Option<&'a mut U> {
        if obj.is::<U>() {
            return obj.downcast_mut::<U>();
        }
        let parent = self.parent.as_ref()?;
        let base = (parent.upcast?.up_mut)(obj)?;
        parent.table.cast_mut::<U>(base)
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("name", &self.name)
            .field("base", &self.base().map(|b| b.name()))
            .finish_non_exhaustive()
    }
}
