//! The class registry and nominal measures.

use rustc_hash::FxHashMap;

use refjs_core::heap::Heap;
use refjs_core::value::{ObjectId, Value};

/// A registered class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    /// Interfaces implemented directly by this class. Interfaces of
    /// ancestors are inherited, not repeated here.
    pub interfaces: Vec<String>,
}

/// All registered classes, keyed by name.
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: FxHashMap<String, ClassDef>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, parent: Option<&str>, interfaces: &[&str]) {
        self.classes.insert(
            name.to_owned(),
            ClassDef {
                name: name.to_owned(),
                parent: parent.map(str::to_owned),
                interfaces: interfaces.iter().map(|i| (*i).to_owned()).collect(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    /// Whether `name` is `ancestor` or transitively extends it.
    pub fn is_subclass(&self, name: &str, ancestor: &str) -> bool {
        let mut current = Some(name.to_owned());
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.classes.get(&c).and_then(|d| d.parent.clone());
        }
        false
    }

    /// Whether `name` or any of its ancestors implements `iface`.
    pub fn implements(&self, name: &str, iface: &str) -> bool {
        let mut current = Some(name.to_owned());
        while let Some(c) = current {
            let Some(def) = self.classes.get(&c) else {
                return false;
            };
            if def.interfaces.iter().any(|i| i == iface) {
                return true;
            }
            current = def.parent.clone();
        }
        false
    }

    /// The `extends_class` measure: the value is an object constructed by
    /// `name` or one of its subclasses. False on every non-object, including
    /// null.
    pub fn extends_class(&self, heap: &Heap, v: &Value, name: &str) -> bool {
        match v {
            Value::Object(id) => match &heap.object(*id).constructed_by {
                Some(class) => self.is_subclass(class, name),
                None => false,
            },
            _ => false,
        }
    }

    /// The `extends_interface` measure, derived from the class chain.
    pub fn extends_interface(&self, heap: &Heap, v: &Value, iface: &str) -> bool {
        match v {
            Value::Object(id) => match &heap.object(*id).constructed_by {
                Some(class) => self.implements(class, iface),
                None => false,
            },
            _ => false,
        }
    }

    /// Allocate an instance of a registered class. The fresh object records
    /// its constructor so the nominal measures can observe it.
    pub fn construct(&self, heap: &mut Heap, name: &str) -> Option<ObjectId> {
        self.classes.get(name)?;
        Some(heap.alloc_object(None, Some(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassTable {
        let mut classes = ClassTable::new();
        classes.register("Shape", None, &["Measurable"]);
        classes.register("Circle", Some("Shape"), &[]);
        classes.register("Dot", Some("Circle"), &["Tiny"]);
        classes.register("Color", None, &[]);
        classes
    }

    #[test]
    fn subclassing_is_reflexive_and_transitive() {
        let classes = sample();
        assert!(classes.is_subclass("Circle", "Circle"));
        assert!(classes.is_subclass("Dot", "Shape"));
        assert!(!classes.is_subclass("Shape", "Dot"));
        assert!(!classes.is_subclass("Color", "Shape"));
    }

    #[test]
    fn interfaces_are_inherited_down_the_chain() {
        let classes = sample();
        assert!(classes.implements("Shape", "Measurable"));
        assert!(classes.implements("Dot", "Measurable"));
        assert!(classes.implements("Dot", "Tiny"));
        assert!(!classes.implements("Circle", "Tiny"));
    }

    #[test]
    fn extends_class_observes_the_constructor() {
        let classes = sample();
        let mut heap = Heap::new();
        let dot = classes.construct(&mut heap, "Dot").unwrap();
        let v = Value::Object(dot);
        assert!(classes.extends_class(&heap, &v, "Dot"));
        assert!(classes.extends_class(&heap, &v, "Shape"));
        assert!(!classes.extends_class(&heap, &v, "Color"));
        // Non-objects, null included, never extend a class.
        assert!(!classes.extends_class(&heap, &Value::Null, "Shape"));
        assert!(!classes.extends_class(&heap, &Value::Number(1.0), "Shape"));
    }

    #[test]
    fn plain_objects_have_no_nominal_identity() {
        let classes = sample();
        let mut heap = Heap::new();
        let plain = heap.alloc_object(None, None);
        assert!(!classes.extends_class(&heap, &Value::Object(plain), "Shape"));
        assert!(!classes.extends_interface(&heap, &Value::Object(plain), "Measurable"));
    }

    #[test]
    fn constructing_an_unknown_class_fails() {
        let classes = sample();
        let mut heap = Heap::new();
        assert!(classes.construct(&mut heap, "Nope").is_none());
    }
}
