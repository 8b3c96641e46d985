//! Integration tests for class registration: constructors, methods,
//! properties, data members and static members.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{first, new_state};
use scriptbridge::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: f64,
    y: f64,
    label: String,
}

impl Default for Point {
    fn default() -> Self {
        Point {
            x: 0.0,
            y: 0.0,
            label: "origin".to_string(),
        }
    }
}

impl Point {
    fn new(x: f64, y: f64) -> Self {
        Point {
            x,
            y,
            ..Point::default()
        }
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    fn origin() -> Owned<Point> {
        Owned(Point::default())
    }
}

fn register_point(state: &mut State) -> Result<(), RegistrationError> {
    get_global_namespace(state)
        .begin_class::<Point>("Point")
        .add_constructor(Point::default)
        .add_property("x", Point::x, Point::set_x)?
        .add_data("y", field!(Point, y), true)?
        .add_readonly_property("label", Point::label)?
        .add_function("length", Point::length)?
        .add_function("translate", Point::translate)?
        .add_static_function("origin", Point::origin)?
        .end_class();
    Ok(())
}

fn new_point(state: &mut State) -> Value {
    first(state.call_global("Point", []).unwrap())
}

// =============================================================================
// Properties and data members
// =============================================================================

#[test]
fn test_writable_property_round_trip() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = new_point(&mut state);
    state.set_field(&p, "x", 5.0).unwrap();
    assert_eq!(state.get_field(&p, "x").unwrap(), Value::Number(5.0));
}

#[test]
fn test_readonly_property_rejects_writes() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = new_point(&mut state);
    let err = state.set_field(&p, "label", "a").unwrap_err();
    assert_eq!(err.to_string(), "'label' is read-only");
    assert_eq!(state.get_field(&p, "label").unwrap(), Value::from("origin"));
}

#[test]
fn test_data_member_round_trip() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = new_point(&mut state);
    state.set_field(&p, "y", Value::Integer(7)).unwrap();
    assert_eq!(state.get_field(&p, "y").unwrap(), Value::Number(7.0));
    assert_eq!(borrow_object::<Point>(&p).unwrap().y, 7.0);
}

#[test]
fn test_readonly_data_member() {
    #[derive(Default)]
    struct Version {
        major: u32,
    }

    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Version>("Version")
        .add_constructor(|| Version { major: 3 })
        .add_data("major", field!(Version, major), false)
        .unwrap()
        .end_class();

    let v = first(state.call_global("Version", []).unwrap());
    let err = state.set_field(&v, "major", 4).unwrap_err();
    assert_eq!(err, ScriptError::ReadOnly { name: "major".into() });
    assert_eq!(state.get_field(&v, "major").unwrap(), Value::Integer(3));
}

#[test]
fn test_primitive_members_round_trip() {
    #[derive(Default)]
    struct Settings {
        enabled: bool,
        volume: u8,
        offset: i32,
        ratio: f32,
        name: String,
        key: char,
        limit: Option<i64>,
    }

    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Settings>("Settings")
        .add_constructor(Settings::default)
        .add_data("enabled", field!(Settings, enabled), true)
        .and_then(|c| c.add_data("volume", field!(Settings, volume), true))
        .and_then(|c| c.add_data("offset", field!(Settings, offset), true))
        .and_then(|c| c.add_data("ratio", field!(Settings, ratio), true))
        .and_then(|c| c.add_data("name", field!(Settings, name), true))
        .and_then(|c| c.add_data("key", field!(Settings, key), true))
        .and_then(|c| c.add_data("limit", field!(Settings, limit), true))
        .unwrap()
        .end_class();

    let s = first(state.call_global("Settings", []).unwrap());
    let cases = [
        ("enabled", Value::Boolean(true)),
        ("volume", Value::Integer(200)),
        ("offset", Value::Integer(-12)),
        ("ratio", Value::Number(0.5)),
        ("name", Value::from("hello")),
        ("key", Value::from("k")),
        ("limit", Value::Integer(99)),
        ("limit", Value::Nil),
    ];
    for (member, value) in cases {
        state.set_field(&s, member, value.clone()).unwrap();
        assert_eq!(state.get_field(&s, member).unwrap(), value, "{member}");
    }
}

#[test]
fn test_out_of_range_assignment_fails() {
    #[derive(Default)]
    struct Byte {
        value: u8,
    }

    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Byte>("Byte")
        .add_constructor(Byte::default)
        .add_data("value", field!(Byte, value), true)
        .unwrap()
        .end_class();

    let b = first(state.call_global("Byte", []).unwrap());
    let err = state.set_field(&b, "value", 300).unwrap_err();
    assert!(matches!(err, ScriptError::BadArgument { position: 2, .. }));
    assert_eq!(state.get_field(&b, "value").unwrap(), Value::Integer(0));
}

#[test]
fn test_unknown_members() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = new_point(&mut state);
    assert_eq!(state.get_field(&p, "z").unwrap(), Value::Nil);
    let err = state.set_field(&p, "z", 1.0).unwrap_err();
    assert_eq!(err.to_string(), "No writable member 'z'");
}

// =============================================================================
// Methods and constructors
// =============================================================================

#[test]
fn test_method_calls() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = new_point(&mut state);
    state
        .call_method(&p, "translate", [Value::Number(3.0), Value::Integer(4)])
        .unwrap();
    let length = state.call_method(&p, "length", []).unwrap();
    assert_eq!(length, vec![Value::Number(5.0)]);
}

#[test]
fn test_constructor_arguments() {
    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Point>("Point")
        .add_constructor(Point::new)
        .add_function("length", Point::length)
        .unwrap()
        .end_class();

    let p = first(
        state
            .call_global("Point", [Value::Number(6.0), Value::Number(8.0)])
            .unwrap(),
    );
    assert_eq!(
        state.call_method(&p, "length", []).unwrap(),
        vec![Value::Number(10.0)]
    );

    let err = state
        .call_global("Point", [Value::Number(1.0), Value::from("up")])
        .unwrap_err();
    assert_eq!(err.to_string(), "bad argument #3 (number expected, got string)");
}

#[test]
fn test_class_without_constructor_is_not_callable() {
    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Point>("Point")
        .end_class();

    let err = state.call_global("Point", []).unwrap_err();
    assert_eq!(err.to_string(), "attempt to call a table value");
}

#[test]
fn test_raw_methods() {
    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Point>("Point")
        .add_constructor(Point::default)
        .add_cfunction("scale", |p: &mut Point, ctx| {
            let factor: f64 = ctx.get(2)?;
            p.x *= factor;
            p.y *= factor;
            Ok(0)
        })
        .and_then(|c| {
            c.add_const_cfunction("coords", |p: &Point, ctx| {
                ctx.push(p.x);
                ctx.push(p.y);
                Ok(2)
            })
        })
        .and_then(|c| c.add_data("x", field!(Point, x), true))
        .unwrap()
        .end_class();

    let p = first(state.call_global("Point", []).unwrap());
    state.set_field(&p, "x", 2.0).unwrap();
    state.call_method(&p, "scale", [Value::Number(1.5)]).unwrap();
    assert_eq!(
        state.call_method(&p, "coords", []).unwrap(),
        vec![Value::Number(3.0), Value::Number(0.0)]
    );
}

#[test]
fn test_objects_as_arguments() {
    let mut state = new_state();
    register_point(&mut state).unwrap();
    get_global_namespace(&mut state).add_function(
        "distance",
        |a: Owned<Point>, b: Owned<Point>| {
            let (dx, dy) = (a.0.x - b.0.x, a.0.y - b.0.y);
            (dx * dx + dy * dy).sqrt()
        },
    );

    let a = new_point(&mut state);
    let b = new_point(&mut state);
    state.set_field(&b, "x", 3.0).unwrap();
    state.set_field(&b, "y", 4.0).unwrap();
    let d = state.call_global("distance", [a, b]).unwrap();
    assert_eq!(d, vec![Value::Number(5.0)]);

    let err = state
        .call_global("distance", [Value::Integer(1), Value::Integer(2)])
        .unwrap_err();
    assert!(matches!(err, ScriptError::BadArgument { position: 1, .. }));
}

#[test]
fn test_reserved_member_name() {
    let mut state = new_state();
    let result = get_global_namespace(&mut state)
        .begin_class::<Point>("Point")
        .add_function("__gc", Point::length);
    assert_eq!(
        result.err(),
        Some(RegistrationError::ReservedName { name: "__gc".into() })
    );
}

// =============================================================================
// Static members
// =============================================================================

#[test]
fn test_static_function_returns_object() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let class = state.get_global("Point").unwrap();
    let origin = state.get_field(&class, "origin").unwrap();
    let p = first(state.call(&origin, []).unwrap());
    assert_eq!(*borrow_object::<Point>(&p).unwrap(), Point::default());
    assert_eq!(state.get_field(&p, "label").unwrap(), Value::from("origin"));
}

#[test]
fn test_static_data_and_properties() {
    let instances = Rc::new(RefCell::new(0u32));
    let scale = Rc::new(RefCell::new(1.0f64));
    let getter_scale = scale.clone();
    let setter_scale = scale.clone();

    let mut state = new_state();
    get_global_namespace(&mut state)
        .begin_class::<Point>("Point")
        .add_static_data("instances", instances.clone(), false)
        .and_then(|c| {
            c.add_static_property(
                "scale",
                move || *getter_scale.borrow(),
                move |v: f64| *setter_scale.borrow_mut() = v,
            )
        })
        .and_then(|c| c.add_static_readonly_property("dimensions", || 2i32))
        .and_then(|c| {
            c.add_static_cfunction("count", |ctx| {
                ctx.push(ctx.arg_count() as i64);
                Ok(1)
            })
        })
        .unwrap()
        .end_class();

    let class = state.get_global("Point").unwrap();

    *instances.borrow_mut() = 4;
    assert_eq!(state.get_field(&class, "instances").unwrap(), Value::Integer(4));
    let err = state.set_field(&class, "instances", 5).unwrap_err();
    assert_eq!(err.to_string(), "'instances' is read-only");

    state.set_field(&class, "scale", 2.5).unwrap();
    assert_eq!(*scale.borrow(), 2.5);
    assert_eq!(state.get_field(&class, "scale").unwrap(), Value::Number(2.5));

    assert_eq!(state.get_field(&class, "dimensions").unwrap(), Value::Integer(2));
    assert!(state.set_field(&class, "dimensions", 3).is_err());

    let count = state.get_field(&class, "count").unwrap();
    let n = state
        .call(&count, [Value::Nil, Value::Nil, Value::Nil])
        .unwrap();
    assert_eq!(n, vec![Value::Integer(3)]);
}

#[test]
fn test_external_objects() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = push_value(&state, Point::new(1.0, 0.0)).unwrap();
    state.set_global("p", p).unwrap();

    let p = state.get_global("p").unwrap();
    state.call_method(&p, "translate", [Value::Number(-1.0), Value::Number(2.0)]).unwrap();
    assert_eq!(state.call_method(&p, "length", []).unwrap(), vec![Value::Number(2.0)]);

    let boxed = push_boxed(&state, Box::new(Point::new(0.0, 3.0))).unwrap();
    assert_eq!(
        state.call_method(&boxed, "length", []).unwrap(),
        vec![Value::Number(3.0)]
    );
}

#[test]
fn test_protected_metatables() {
    let mut state = new_state();
    register_point(&mut state).unwrap();

    let p = new_point(&mut state);
    assert_eq!(state.get_metatable(&p), Some(Value::Boolean(false)));

    let mut open = State::with_config(Config::default().with_hide_metatables(false));
    register_point(&mut open).unwrap();
    let p = new_point(&mut open);
    assert!(matches!(open.get_metatable(&p), Some(Value::Table(_))));
}

#[test]
fn test_same_named_types_register_separately() {
    fn register_meters(state: &mut State) {
        struct Reading(f64);
        get_global_namespace(state)
            .begin_class::<Reading>("Meters")
            .add_constructor(|v: f64| Reading(v))
            .add_function("value", |r: &Reading| r.0)
            .unwrap()
            .end_class();
    }
    fn register_feet(state: &mut State) {
        struct Reading(f64);
        get_global_namespace(state)
            .begin_class::<Reading>("Feet")
            .add_constructor(|v: f64| Reading(v * 3.0))
            .add_function("value", |r: &Reading| r.0)
            .unwrap()
            .end_class();
    }

    let mut state = new_state();
    register_meters(&mut state);
    register_feet(&mut state);

    let meters = first(state.call_global("Meters", [Value::Number(2.0)]).unwrap());
    let feet = first(state.call_global("Feet", [Value::Number(2.0)]).unwrap());
    assert_eq!(
        state.call_method(&meters, "value", []).unwrap(),
        vec![Value::Number(2.0)]
    );
    assert_eq!(
        state.call_method(&feet, "value", []).unwrap(),
        vec![Value::Number(6.0)]
    );
}
