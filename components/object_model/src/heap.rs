//! Heap of runtime entities and the full-resolution algorithms.
//!
//! Entities live in per-kind tables and are referenced by id. The
//! resolution routines here are the slow paths the inline caches fall back
//! to on a miss.

use std::sync::Arc;

use tracing::debug;

use core_types::{
    AttrKind, DescriptorId, FunctionId, GlobalLookup, GlobalOrigin, KeysId, MethodLookup,
    NamespaceId, ObjectId, RuntimeError, RuntimeResult, TypeAttrRef, TypeId, Value, VersionTag,
};

use crate::object::{Instance, InstanceDict};
use crate::types::{Descriptor, DescriptorKind, Function, TypeObject, TypeSpec};
use crate::{Namespace, SharedKeys};

/// Name of the hook consulted when normal attribute resolution fails
pub const GETATTR_HOOK: &str = "__getattr__";

/// Owner of every runtime entity.
///
/// # Example
///
/// ```
/// use core_types::Value;
/// use object_model::{Heap, TypeSpec};
///
/// let mut heap = Heap::new();
/// let point = heap.new_type("Point", &[], TypeSpec::default()).unwrap();
/// let p = Value::Object(heap.new_instance(point));
///
/// heap.set_attribute(&p, "x", Value::Int(1)).unwrap();
/// assert_eq!(heap.get_attribute(&p, "x"), Ok(Value::Int(1)));
/// assert!(heap.get_attribute(&p, "y").is_err());
/// ```
#[derive(Debug)]
pub struct Heap {
    types: Vec<TypeObject>,
    objects: Vec<Instance>,
    keys: Vec<SharedKeys>,
    namespaces: Vec<Namespace>,
    functions: Vec<Function>,
    descriptors: Vec<Descriptor>,
    object_type: TypeId,
    property_type: TypeId,
    member_type: TypeId,
}

enum SplitStore {
    Done,
    Convert,
}

impl Heap {
    /// Creates a heap holding the builtin `object`, `property` and
    /// `member_descriptor` types.
    pub fn new() -> Self {
        let mut heap = Heap {
            types: Vec::new(),
            objects: Vec::new(),
            keys: Vec::new(),
            namespaces: Vec::new(),
            functions: Vec::new(),
            descriptors: Vec::new(),
            object_type: TypeId(0),
            property_type: TypeId(0),
            member_type: TypeId(0),
        };

        heap.types.push(TypeObject {
            name: Arc::from("object"),
            bases: Vec::new(),
            mro: vec![TypeId(0)],
            dict: Namespace::new(),
            version: VersionTag::next(),
            subclasses: Vec::new(),
            shared_keys: None,
            slot_count: 0,
            layout_owner: TypeId(0),
            instance_dict: false,
        });

        let builtin = TypeSpec {
            slots: Vec::new(),
            instance_dict: false,
            split_layout: false,
        };
        // Single-inheritance from `object` always linearizes.
        if let Ok(ty) = heap.new_type("property", &[], builtin.clone()) {
            heap.property_type = ty;
        }
        if let Ok(ty) = heap.new_type("member_descriptor", &[], builtin) {
            heap.member_type = ty;
        }
        heap
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// The root type
    pub fn object_type(&self) -> TypeId {
        self.object_type
    }

    /// Type of property descriptors
    pub fn property_type(&self) -> TypeId {
        self.property_type
    }

    /// Type of slot member descriptors
    pub fn member_type(&self) -> TypeId {
        self.member_type
    }

    /// Type object for `ty`
    pub fn type_obj(&self, ty: TypeId) -> &TypeObject {
        &self.types[ty.index()]
    }

    /// Name of `ty`
    pub fn type_name(&self, ty: TypeId) -> &str {
        &self.types[ty.index()].name
    }

    /// Creates a type. An empty `bases` means `object`.
    ///
    /// Slots declared by `spec` become member descriptors in the type dict,
    /// numbered after the slots of the base with the widest layout. Bases
    /// whose slot layouts are not prefixes of that layout are rejected.
    pub fn new_type(&mut self, name: &str, bases: &[TypeId], spec: TypeSpec) -> RuntimeResult<TypeId> {
        let bases = if bases.is_empty() {
            vec![self.object_type]
        } else {
            bases.to_vec()
        };
        let id = TypeId(self.types.len() as u32);
        let mro = self.linearize(id, &bases)?;

        let layout = self.layout_base(&bases)?;
        let base_slots = self.types[layout.index()].slot_count;
        let layout_owner = if spec.slots.is_empty() {
            self.types[layout.index()].layout_owner
        } else {
            id
        };
        let instance_dict =
            spec.instance_dict || bases.iter().any(|b| self.types[b.index()].instance_dict);

        let mut dict = Namespace::new();
        for (i, slot) in spec.slots.iter().enumerate() {
            let descr = self.push_descriptor(Descriptor {
                kind: DescriptorKind::Member {
                    name: Arc::from(slot.as_str()),
                    slot: base_slots + i,
                },
                class: self.member_type,
            });
            dict.insert(slot, Value::Descriptor(descr));
        }

        let shared_keys = if instance_dict && spec.split_layout {
            self.keys.push(SharedKeys::new());
            Some(KeysId(self.keys.len() as u32 - 1))
        } else {
            None
        };

        self.types.push(TypeObject {
            name: Arc::from(name),
            bases: bases.clone(),
            mro,
            dict,
            version: VersionTag::next(),
            subclasses: Vec::new(),
            shared_keys,
            slot_count: base_slots + spec.slots.len(),
            layout_owner,
            instance_dict,
        });
        for base in bases {
            self.types[base.index()].subclasses.push(id);
        }
        Ok(id)
    }

    // Base whose slot layout a new type extends. Every other base must
    // inherit its slots from a type in that base's MRO.
    fn layout_base(&self, bases: &[TypeId]) -> RuntimeResult<TypeId> {
        let mut layout = bases[0];
        for &base in bases {
            if self.types[base.index()].slot_count > self.types[layout.index()].slot_count {
                layout = base;
            }
        }
        let mro = &self.types[layout.index()].mro;
        for &base in bases {
            if !mro.contains(&self.types[base.index()].layout_owner) {
                return Err(RuntimeError::type_error(
                    "multiple bases have instance lay-out conflict",
                ));
            }
        }
        Ok(layout)
    }

    // C3 linearization of `id` over `bases`.
    fn linearize(&self, id: TypeId, bases: &[TypeId]) -> RuntimeResult<Vec<TypeId>> {
        let mut seqs: Vec<Vec<TypeId>> = bases
            .iter()
            .map(|b| self.types[b.index()].mro.clone())
            .collect();
        seqs.push(bases.to_vec());

        let mut mro = vec![id];
        loop {
            seqs.retain(|s| !s.is_empty());
            if seqs.is_empty() {
                return Ok(mro);
            }
            let head = seqs
                .iter()
                .map(|s| s[0])
                .find(|c| seqs.iter().all(|s| !s[1..].contains(c)))
                .ok_or_else(|| {
                    RuntimeError::type_error(
                        "Cannot create a consistent method resolution order (MRO)",
                    )
                })?;
            mro.push(head);
            for s in seqs.iter_mut() {
                if s[0] == head {
                    s.remove(0);
                }
            }
        }
    }

    /// Sets an attribute on a type, invalidating it and all subclasses.
    pub fn set_type_attr(&mut self, ty: TypeId, name: &str, value: Value) {
        self.types[ty.index()].dict.insert(name, value);
        self.invalidate_type(ty);
    }

    /// Deletes an attribute from a type, invalidating it and all subclasses.
    pub fn del_type_attr(&mut self, ty: TypeId, name: &str) -> RuntimeResult<()> {
        if self.types[ty.index()].dict.remove(name).is_none() {
            return Err(RuntimeError::attribute_error("type", name));
        }
        self.invalidate_type(ty);
        Ok(())
    }

    fn invalidate_type(&mut self, ty: TypeId) {
        let mut pending = vec![ty];
        while let Some(t) = pending.pop() {
            let obj = &mut self.types[t.index()];
            obj.version = VersionTag::next();
            pending.extend(obj.subclasses.iter().copied());
        }
    }

    /// Attribute lookup along the MRO, without descriptor calls
    pub fn lookup_type_attr(&self, ty: TypeId, name: &str) -> Option<Value> {
        self.types[ty.index()]
            .mro
            .iter()
            .find_map(|t| self.types[t.index()].dict.get(name).cloned())
    }

    /// Attribute lookup along the MRO, reporting the defining type and the
    /// entry index in its dict.
    pub fn find_type_attr(&self, ty: TypeId, name: &str) -> Option<(TypeAttrRef, Value)> {
        self.types[ty.index()].mro.iter().find_map(|t| {
            let (index, value) = self.types[t.index()].dict.find(name)?;
            let attr = TypeAttrRef {
                owner: *t,
                index: u32::try_from(index).ok()?,
            };
            Some((attr, value.clone()))
        })
    }

    /// Value behind `attr` if that entry of the owner's dict still holds `name`
    pub fn type_attr_at(&self, attr: TypeAttrRef, name: &str) -> Option<Value> {
        self.types
            .get(attr.owner.index())?
            .dict
            .entry_at(attr.index as usize, name)
            .cloned()
    }

    /// Descriptor classification of a type attribute
    pub fn classify_attr(&self, attr: &Value) -> AttrKind {
        match attr {
            Value::Function(f) => AttrKind::Method(*f),
            Value::Descriptor(d) => {
                let descr = &self.descriptors[d.index()];
                match descr.kind {
                    DescriptorKind::Member { slot, .. } => AttrKind::Slot {
                        descr: *d,
                        index: slot,
                    },
                    DescriptorKind::Property { .. } => AttrKind::DataDescriptor {
                        descr: *d,
                        class: descr.class,
                    },
                }
            }
            _ => AttrKind::Plain,
        }
    }

    // ------------------------------------------------------------------
    // Functions and descriptors
    // ------------------------------------------------------------------

    /// Registers a native function.
    pub fn new_function<F>(&mut self, name: &str, body: F) -> FunctionId
    where
        F: Fn(&Heap, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.functions.push(Function {
            name: Arc::from(name),
            body: Arc::new(body),
        });
        FunctionId(self.functions.len() as u32 - 1)
    }

    /// Function object for `f`
    pub fn function(&self, f: FunctionId) -> &Function {
        &self.functions[f.index()]
    }

    /// Calls `f` with positional arguments.
    pub fn call(&self, f: FunctionId, args: &[Value]) -> RuntimeResult<Value> {
        let body = &self.functions[f.index()].body;
        body(self, args)
    }

    /// Calls a resolved callable. Bound methods receive their receiver first.
    pub fn call_value(&self, callee: &Value, args: &[Value]) -> RuntimeResult<Value> {
        match callee {
            Value::Function(f) => self.call(*f, args),
            Value::BoundMethod { function, receiver } => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(Value::Object(*receiver));
                full.extend_from_slice(args);
                self.call(*function, &full)
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                self.value_type_name(other)
            ))),
        }
    }

    /// Creates a read-only property whose getter receives the instance.
    pub fn new_property(&mut self, getter: FunctionId) -> DescriptorId {
        self.push_descriptor(Descriptor {
            kind: DescriptorKind::Property { getter },
            class: self.property_type,
        })
    }

    fn push_descriptor(&mut self, descr: Descriptor) -> DescriptorId {
        self.descriptors.push(descr);
        DescriptorId(self.descriptors.len() as u32 - 1)
    }

    /// Descriptor object for `d`
    pub fn descriptor(&self, d: DescriptorId) -> &Descriptor {
        &self.descriptors[d.index()]
    }

    /// Runs a data descriptor's getter for `obj`.
    pub fn descriptor_get(&self, d: DescriptorId, obj: ObjectId) -> RuntimeResult<Value> {
        match &self.descriptors[d.index()].kind {
            DescriptorKind::Property { getter } => self.call(*getter, &[Value::Object(obj)]),
            DescriptorKind::Member { name, slot } => self.objects[obj.index()]
                .slots
                .get(*slot)
                .cloned()
                .flatten()
                .ok_or_else(|| {
                    RuntimeError::attribute_error(self.type_name(self.objects[obj.index()].class), name)
                }),
        }
    }

    // ------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------

    /// Creates an empty namespace.
    pub fn new_namespace(&mut self) -> NamespaceId {
        self.namespaces.push(Namespace::new());
        NamespaceId(self.namespaces.len() as u32 - 1)
    }

    /// Namespace for `ns`
    pub fn namespace(&self, ns: NamespaceId) -> &Namespace {
        &self.namespaces[ns.index()]
    }

    /// Binds `name` in `ns`.
    pub fn set_name(&mut self, ns: NamespaceId, name: &str, value: Value) {
        self.namespaces[ns.index()].insert(name, value);
    }

    /// Unbinds `name` in `ns`.
    pub fn del_name(&mut self, ns: NamespaceId, name: &str) -> RuntimeResult<()> {
        self.namespaces[ns.index()]
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::name_error(name))
    }

    /// Full global lookup: primary namespace, then fallback.
    pub fn resolve_global(
        &self,
        name: &str,
        globals: NamespaceId,
        builtins: NamespaceId,
    ) -> RuntimeResult<GlobalLookup> {
        if let Some((index, value)) = self.namespaces[globals.index()].find(name) {
            return Ok(GlobalLookup {
                value: value.clone(),
                origin: GlobalOrigin::Primary { index },
            });
        }
        match self.namespaces[builtins.index()].find(name) {
            Some((index, value)) => Ok(GlobalLookup {
                value: value.clone(),
                origin: GlobalOrigin::Fallback { index },
            }),
            None => Err(RuntimeError::name_error(name)),
        }
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Creates an instance of `ty`.
    pub fn new_instance(&mut self, ty: TypeId) -> ObjectId {
        let class = &self.types[ty.index()];
        let dict = if !class.instance_dict {
            None
        } else if let Some(keys) = class.shared_keys {
            Some(InstanceDict::split(keys))
        } else {
            Some(InstanceDict::Generic(Namespace::new()))
        };
        self.objects.push(Instance::new(ty, dict, class.slot_count));
        ObjectId(self.objects.len() as u32 - 1)
    }

    /// Instance for `obj`
    pub fn object(&self, obj: ObjectId) -> &Instance {
        &self.objects[obj.index()]
    }

    /// Shared key table for `keys`
    pub fn shared_keys(&self, keys: KeysId) -> &SharedKeys {
        &self.keys[keys.index()]
    }

    /// Type name as reported in error messages
    pub fn value_type_name(&self, value: &Value) -> String {
        match value {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Object(id) => self.type_name(self.objects[id.index()].class).to_string(),
            Value::Type(_) => "type".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::BoundMethod { .. } => "method".to_string(),
            Value::Descriptor(d) => self.type_name(self.descriptors[d.index()].class).to_string(),
        }
    }

    pub(crate) fn instance_dict_get(&self, obj: ObjectId, name: &str) -> Option<Value> {
        match &self.objects[obj.index()].dict {
            None => None,
            Some(InstanceDict::Generic(ns)) => ns.get(name).cloned(),
            Some(InstanceDict::Split { keys, values, .. }) => self.keys[keys.index()]
                .index_of(name)
                .and_then(|i| values.get(i).cloned()),
        }
    }

    /// Full attribute resolution.
    ///
    /// Order: data descriptor on the type, instance dict, type attribute
    /// (functions are bound to the receiver), `__getattr__` hook.
    pub fn get_attribute(&self, obj: &Value, name: &str) -> RuntimeResult<Value> {
        let Value::Object(id) = obj else {
            return Err(RuntimeError::attribute_error(&self.value_type_name(obj), name));
        };
        let class = self.objects[id.index()].class;
        let type_attr = self.lookup_type_attr(class, name);

        if let Some(attr) = &type_attr {
            match self.classify_attr(attr) {
                AttrKind::DataDescriptor { descr, .. } | AttrKind::Slot { descr, .. } => {
                    return self.descriptor_get(descr, *id);
                }
                AttrKind::Plain | AttrKind::Method(_) => {}
            }
        }

        if let Some(value) = self.instance_dict_get(*id, name) {
            return Ok(value);
        }

        match type_attr {
            Some(Value::Function(function)) => Ok(Value::BoundMethod {
                function,
                receiver: *id,
            }),
            Some(value) => Ok(value),
            None => match self.lookup_type_attr(class, GETATTR_HOOK) {
                Some(Value::Function(hook)) => self.call(hook, &[obj.clone(), Value::str(name)]),
                _ => Err(RuntimeError::attribute_error(self.type_name(class), name)),
            },
        }
    }

    /// Full method resolution.
    ///
    /// A function found on the type and not shadowed by the instance dict is
    /// returned unbound.
    pub fn load_method(&self, obj: &Value, name: &str) -> RuntimeResult<MethodLookup> {
        if let Value::Object(id) = obj {
            let class = self.objects[id.index()].class;
            if let Some(Value::Function(function)) = self.lookup_type_attr(class, name) {
                if self.instance_dict_get(*id, name).is_none() {
                    return Ok(MethodLookup {
                        value: Value::Function(function),
                        unbound: true,
                    });
                }
            }
        }
        Ok(MethodLookup {
            value: self.get_attribute(obj, name)?,
            unbound: false,
        })
    }

    /// Full attribute store. May extend the shared layout of the instance's
    /// type, or convert the instance to a generic dict.
    pub fn set_attribute(&mut self, obj: &Value, name: &str, value: Value) -> RuntimeResult<()> {
        let Value::Object(id) = obj else {
            return Err(RuntimeError::attribute_error(&self.value_type_name(obj), name));
        };
        let class = self.objects[id.index()].class;
        if let Some(attr) = self.lookup_type_attr(class, name) {
            match self.classify_attr(&attr) {
                AttrKind::Slot { index, .. } => {
                    let type_name = self.type_name(class).to_string();
                    return match self.objects[id.index()].slots.get_mut(index) {
                        Some(slot) => {
                            *slot = Some(value);
                            Ok(())
                        }
                        None => Err(RuntimeError::attribute_error(&type_name, name)),
                    };
                }
                AttrKind::DataDescriptor { .. } => {
                    return Err(RuntimeError::ReadOnlyAttribute {
                        name: name.to_string(),
                    });
                }
                AttrKind::Plain | AttrKind::Method(_) => {}
            }
        }
        self.store_in_dict(*id, name, value)
    }

    fn store_in_dict(&mut self, id: ObjectId, name: &str, value: Value) -> RuntimeResult<()> {
        let outcome = {
            let inst = &mut self.objects[id.index()];
            match &mut inst.dict {
                None => {
                    return Err(RuntimeError::attribute_error(
                        &self.types[inst.class.index()].name,
                        name,
                    ));
                }
                Some(InstanceDict::Generic(ns)) => {
                    ns.insert(name, value);
                    return Ok(());
                }
                Some(InstanceDict::Split {
                    keys,
                    values,
                    version,
                }) => {
                    let table = &mut self.keys[keys.index()];
                    match table.index_of(name) {
                        Some(i) if i < values.len() => {
                            values[i] = value.clone();
                            *version = VersionTag::next();
                            SplitStore::Done
                        }
                        Some(i) if i == values.len() => {
                            values.push(value.clone());
                            *version = VersionTag::next();
                            SplitStore::Done
                        }
                        Some(_) => SplitStore::Convert,
                        None => {
                            if values.len() == table.len() && table.append(name).is_some() {
                                values.push(value.clone());
                                *version = VersionTag::next();
                                SplitStore::Done
                            } else {
                                SplitStore::Convert
                            }
                        }
                    }
                }
            }
        };

        match outcome {
            SplitStore::Done => Ok(()),
            SplitStore::Convert => {
                self.make_generic(id);
                if let Some(InstanceDict::Generic(ns)) = &mut self.objects[id.index()].dict {
                    ns.insert(name, value);
                }
                Ok(())
            }
        }
    }

    // Converts a split instance dict to a private generic dict and detaches
    // the layout from the type, so later instances start generic.
    fn make_generic(&mut self, id: ObjectId) {
        let inst = &mut self.objects[id.index()];
        let converted = match &inst.dict {
            Some(InstanceDict::Split { keys, values, .. }) => {
                let table = &self.keys[keys.index()];
                let mut ns = Namespace::new();
                for (i, v) in values.iter().enumerate() {
                    if let Some(k) = table.key(i) {
                        ns.insert(k, v.clone());
                    }
                }
                Some((*keys, ns))
            }
            _ => None,
        };
        if let Some((keys, ns)) = converted {
            debug!(object = id.0, keys = keys.0, "instance dict converted to generic");
            inst.dict = Some(InstanceDict::Generic(ns));
            let class = &mut self.types[inst.class.index()];
            if class.shared_keys == Some(keys) {
                class.shared_keys = None;
            }
        }
    }

    /// Full attribute delete.
    pub fn del_attribute(&mut self, obj: &Value, name: &str) -> RuntimeResult<()> {
        let Value::Object(id) = obj else {
            return Err(RuntimeError::attribute_error(&self.value_type_name(obj), name));
        };
        let class = self.objects[id.index()].class;
        let type_name = self.type_name(class).to_string();
        let missing = || RuntimeError::attribute_error(&type_name, name);

        if let Some(attr) = self.lookup_type_attr(class, name) {
            match self.classify_attr(&attr) {
                AttrKind::Slot { index, .. } => {
                    return self.objects[id.index()]
                        .slots
                        .get_mut(index)
                        .and_then(Option::take)
                        .map(|_| ())
                        .ok_or_else(missing);
                }
                AttrKind::DataDescriptor { .. } => {
                    return Err(RuntimeError::ReadOnlyAttribute {
                        name: name.to_string(),
                    });
                }
                AttrKind::Plain | AttrKind::Method(_) => {}
            }
        }

        if self.instance_dict_get(*id, name).is_none() {
            return Err(missing());
        }
        self.make_generic(*id);
        match &mut self.objects[id.index()].dict {
            Some(InstanceDict::Generic(ns)) => {
                ns.remove(name);
                Ok(())
            }
            _ => Err(missing()),
        }
    }

    pub(crate) fn objects(&self) -> &[Instance] {
        &self.objects
    }

    pub(crate) fn objects_mut(&mut self) -> &mut [Instance] {
        &mut self.objects
    }

    pub(crate) fn types(&self) -> &[TypeObject] {
        &self.types
    }

    pub(crate) fn key_tables(&self) -> &[SharedKeys] {
        &self.keys
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
