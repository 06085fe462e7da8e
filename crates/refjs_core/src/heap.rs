//! Container storage.
//!
//! Objects and arrays live in arena-style tables addressed by id, so that
//! aliasing is observable and qualifiers can be tracked per container. All
//! mutating operations check the container's qualifier; construction-time
//! definition of properties does not, since a fresh container is unique by
//! construction.

use bitflags::bitflags;
use indexmap::IndexMap;
use thiserror::Error;

use refjs_types::mutability::{Mutability, MutabilityError};

use crate::value::{ArrayId, ObjectId, Value};

bitflags! {
    /// Attributes of a stored property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// Visited by for-in enumeration.
        const ENUMERABLE = 1 << 0;
        /// Declared optional; absence is not an error.
        const OPTIONAL = 1 << 1;
    }
}

/// A single named property of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySlot {
    pub value: Value,
    /// Field-level qualifier: a `Mutable` field stays writable even through
    /// receivers that cannot be strongly updated.
    pub qualifier: Mutability,
    pub flags: SlotFlags,
}

/// Storage behind an object handle.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub proto: Option<ObjectId>,
    /// Name of the class whose constructor produced this object, if any.
    pub constructed_by: Option<String>,
    pub qualifier: Mutability,
    slots: IndexMap<String, PropertySlot>,
}

impl ObjectData {
    pub fn slot(&self, name: &str) -> Option<&PropertySlot> {
        self.slots.get(name)
    }

    /// Own slots in insertion order.
    pub fn slots(&self) -> impl Iterator<Item = (&String, &PropertySlot)> {
        self.slots.iter()
    }
}

/// Storage behind an array handle.
#[derive(Debug, Clone)]
pub struct ArrayData {
    pub qualifier: Mutability,
    elems: Vec<Value>,
}

impl ArrayData {
    pub fn elems(&self) -> &[Value] {
        &self.elems
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

/// A fault raised by a container operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeapError {
    #[error("cannot write through a '{0}'-qualified binding")]
    WriteToReadOnly(Mutability),
    #[error("cannot pop from an empty array")]
    EmptyPop,
    #[error(transparent)]
    Mutability(#[from] MutabilityError),
}

/// The heap: all live containers.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<ObjectData>,
    arrays: Vec<ArrayData>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Allocate the result of an array literal. The fresh container has no
    /// other reference yet, so it starts out `UniqueMutable`.
    pub fn array_literal(&mut self, elems: Vec<Value>) -> ArrayId {
        self.alloc_array(Mutability::UniqueMutable, elems)
    }

    pub fn alloc_array(&mut self, qualifier: Mutability, elems: Vec<Value>) -> ArrayId {
        let id = ArrayId(self.arrays.len() as u32);
        self.arrays.push(ArrayData { qualifier, elems });
        id
    }

    pub fn array(&self, id: ArrayId) -> &ArrayData {
        &self.arrays[id.index()]
    }

    pub fn array_len(&self, id: ArrayId) -> usize {
        self.arrays[id.index()].len()
    }

    pub fn array_qualifier(&self, id: ArrayId) -> Mutability {
        self.arrays[id.index()].qualifier
    }

    /// Bracket read. Out-of-range, fractional, and `undefined` subscripts
    /// all produce `undefined` rather than faulting.
    pub fn array_get(&self, id: ArrayId, index: &Value) -> Value {
        let Some(n) = index.as_number() else {
            return Value::Undefined;
        };
        if n < 0.0 || n.fract() != 0.0 {
            return Value::Undefined;
        }
        self.arrays[id.index()]
            .elems
            .get(n as usize)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Bracket write. Writing past the end extends the array with
    /// `undefined` holes, as a dynamic write is bounds-unchecked.
    pub fn array_set(&mut self, id: ArrayId, index: usize, value: Value) -> Result<(), HeapError> {
        let data = &mut self.arrays[id.index()];
        if !data.qualifier.can_write() {
            return Err(HeapError::WriteToReadOnly(data.qualifier));
        }
        if index >= data.elems.len() {
            data.elems.resize(index + 1, Value::Undefined);
        }
        data.elems[index] = value;
        Ok(())
    }

    /// Append; returns the new length.
    pub fn push(&mut self, id: ArrayId, value: Value) -> Result<usize, HeapError> {
        let data = &mut self.arrays[id.index()];
        if !data.qualifier.can_write() {
            return Err(HeapError::WriteToReadOnly(data.qualifier));
        }
        data.elems.push(value);
        Ok(data.elems.len())
    }

    pub fn pop(&mut self, id: ArrayId) -> Result<Value, HeapError> {
        let data = &mut self.arrays[id.index()];
        if !data.qualifier.can_write() {
            return Err(HeapError::WriteToReadOnly(data.qualifier));
        }
        data.elems.pop().ok_or(HeapError::EmptyPop)
    }

    /// In-place reversal. Length-preserving.
    pub fn reverse(&mut self, id: ArrayId) -> Result<(), HeapError> {
        let data = &mut self.arrays[id.index()];
        if !data.qualifier.can_write() {
            return Err(HeapError::WriteToReadOnly(data.qualifier));
        }
        data.elems.reverse();
        Ok(())
    }

    /// Concatenation into a fresh container. Neither input is touched.
    pub fn concat(&mut self, a: ArrayId, b: ArrayId) -> ArrayId {
        let mut elems = self.arrays[a.index()].elems.clone();
        elems.extend(self.arrays[b.index()].elems.iter().cloned());
        self.array_literal(elems)
    }

    pub fn slice(&mut self, id: ArrayId, start: usize, end: Option<usize>) -> ArrayId {
        let elems = &self.arrays[id.index()].elems;
        let end = end.unwrap_or(elems.len()).min(elems.len());
        let start = start.min(end);
        let copied = elems[start..end].to_vec();
        self.array_literal(copied)
    }

    /// Element-wise transform into a fresh `Immutable` array of equal
    /// length. The callback also receives the element's index.
    pub fn map<F>(&mut self, id: ArrayId, mut f: F) -> ArrayId
    where
        F: FnMut(&Value, usize) -> Value,
    {
        let input = self.arrays[id.index()].elems.clone();
        let mapped = input.iter().enumerate().map(|(i, v)| f(v, i)).collect();
        self.alloc_array(Mutability::Immutable, mapped)
    }

    /// Keep the elements the callback accepts; the result is fresh and no
    /// longer than the input.
    pub fn filter<F>(&mut self, id: ArrayId, mut f: F) -> ArrayId
    where
        F: FnMut(&Value, usize) -> bool,
    {
        let input = self.arrays[id.index()].elems.clone();
        let kept = input
            .iter()
            .enumerate()
            .filter(|(i, v)| f(v, *i))
            .map(|(_, v)| v.clone())
            .collect();
        self.array_literal(kept)
    }

    /// Left fold. Every index handed to the callback is a valid index of
    /// the receiver.
    pub fn reduce<U, F>(&self, id: ArrayId, seed: U, mut f: F) -> U
    where
        F: FnMut(U, &Value, usize) -> U,
    {
        let mut acc = seed;
        for (i, v) in self.arrays[id.index()].elems.iter().enumerate() {
            acc = f(acc, v, i);
        }
        acc
    }

    /// Record an aliasing event: a second binding to the same storage now
    /// exists, so unique ownership is forfeited.
    pub fn alias_array(&mut self, id: ArrayId) -> ArrayId {
        let data = &mut self.arrays[id.index()];
        data.qualifier = data.qualifier.aliased();
        id
    }

    /// Seal the container permanently.
    pub fn freeze_array(&mut self, id: ArrayId) -> Result<(), HeapError> {
        let data = &mut self.arrays[id.index()];
        data.qualifier = data.qualifier.frozen()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    pub fn alloc_object(
        &mut self,
        proto: Option<ObjectId>,
        constructed_by: Option<&str>,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(ObjectData {
            proto,
            constructed_by: constructed_by.map(str::to_owned),
            qualifier: Mutability::UniqueMutable,
            slots: IndexMap::new(),
        });
        id
    }

    pub fn object(&self, id: ObjectId) -> &ObjectData {
        &self.objects[id.index()]
    }

    /// Construction-time definition of a property. No capability check: the
    /// container is being built and is unique by construction.
    pub fn define_property(
        &mut self,
        id: ObjectId,
        name: &str,
        value: Value,
        qualifier: Mutability,
        flags: SlotFlags,
    ) {
        self.objects[id.index()].slots.insert(
            name.to_owned(),
            PropertySlot {
                value,
                qualifier,
                flags,
            },
        );
    }

    /// Property read, walking the prototype chain.
    pub fn get_property(&self, id: ObjectId, name: &str) -> Option<&Value> {
        let mut current = Some(id);
        while let Some(oid) = current {
            let data = &self.objects[oid.index()];
            if let Some(slot) = data.slots.get(name) {
                return Some(&slot.value);
            }
            current = data.proto;
        }
        None
    }

    /// Property write. A `UniqueMutable` receiver may strongly update any
    /// field, including adding new ones; otherwise the field itself must be
    /// `Mutable` (and already present).
    pub fn set_property(&mut self, id: ObjectId, name: &str, value: Value) -> Result<(), HeapError> {
        let data = &mut self.objects[id.index()];
        if data.qualifier == Mutability::UniqueMutable {
            match data.slots.get_mut(name) {
                Some(slot) => slot.value = value,
                None => {
                    data.slots.insert(
                        name.to_owned(),
                        PropertySlot {
                            value,
                            qualifier: Mutability::Mutable,
                            flags: SlotFlags::ENUMERABLE,
                        },
                    );
                }
            }
            return Ok(());
        }
        match data.slots.get_mut(name) {
            Some(slot) if slot.qualifier.can_write() => {
                slot.value = value;
                Ok(())
            }
            Some(slot) => Err(HeapError::WriteToReadOnly(slot.qualifier)),
            None => Err(HeapError::WriteToReadOnly(data.qualifier)),
        }
    }

    pub fn alias_object(&mut self, id: ObjectId) -> ObjectId {
        let data = &mut self.objects[id.index()];
        data.qualifier = data.qualifier.aliased();
        id
    }

    pub fn freeze_object(&mut self, id: ObjectId) -> Result<(), HeapError> {
        let data = &mut self.objects[id.index()];
        data.qualifier = data.qualifier.frozen()?;
        Ok(())
    }
}
