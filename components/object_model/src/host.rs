//! `RuntimeHost` implementation for the heap.

use core_types::{
    AttrKind, DescriptorId, GlobalLookup, KeysId, MethodLookup, NamespaceId, ObjectId,
    RuntimeHost, RuntimeResult, StorageShape, TypeAttrRef, TypeId, Value, VersionTag,
};

use crate::object::InstanceDict;
use crate::Heap;

impl Heap {
    fn generic_dict(&self, obj: ObjectId) -> Option<&crate::Namespace> {
        match &self.objects()[obj.index()].dict {
            Some(InstanceDict::Generic(ns)) => Some(ns),
            _ => None,
        }
    }
}

impl RuntimeHost for Heap {
    fn namespace_version(&self, ns: NamespaceId) -> VersionTag {
        self.namespace(ns).version()
    }

    fn namespace_capacity(&self, ns: NamespaceId) -> usize {
        self.namespace(ns).capacity()
    }

    fn namespace_entry(&self, ns: NamespaceId, index: usize, name: &str) -> Option<Value> {
        self.namespace(ns).entry_at(index, name).cloned()
    }

    fn type_of(&self, value: &Value) -> Option<TypeId> {
        value.as_object().map(|id| self.objects()[id.index()].class)
    }

    fn type_version(&self, ty: TypeId) -> VersionTag {
        self.types()[ty.index()].version
    }

    fn lookup_type_attr(&self, ty: TypeId, name: &str) -> Option<Value> {
        Heap::lookup_type_attr(self, ty, name)
    }

    fn find_type_attr(&self, ty: TypeId, name: &str) -> Option<(TypeAttrRef, Value)> {
        Heap::find_type_attr(self, ty, name)
    }

    fn type_attr_at(&self, attr: TypeAttrRef, name: &str) -> Option<Value> {
        Heap::type_attr_at(self, attr, name)
    }

    fn classify_attr(&self, attr: &Value) -> AttrKind {
        Heap::classify_attr(self, attr)
    }

    fn descriptor_get(&self, descr: DescriptorId, obj: ObjectId) -> RuntimeResult<Value> {
        Heap::descriptor_get(self, descr, obj)
    }

    fn instance_storage(&self, obj: ObjectId) -> StorageShape {
        match &self.objects()[obj.index()].dict {
            None => StorageShape::NoDict,
            Some(InstanceDict::Split { keys, version, .. }) => StorageShape::Split {
                keys: *keys,
                dict_version: *version,
            },
            Some(InstanceDict::Generic(ns)) => StorageShape::Generic {
                dict_version: ns.version(),
                capacity: ns.capacity(),
            },
        }
    }

    fn keys_version(&self, keys: KeysId) -> VersionTag {
        self.key_tables()[keys.index()].version()
    }

    fn keys_index(&self, keys: KeysId, name: &str) -> Option<usize> {
        self.key_tables()[keys.index()].index_of(name)
    }

    fn split_value(&self, obj: ObjectId, index: usize) -> Option<Value> {
        match &self.objects()[obj.index()].dict {
            Some(InstanceDict::Split { values, .. }) => values.get(index).cloned(),
            _ => None,
        }
    }

    fn split_replace(&mut self, obj: ObjectId, index: usize, value: Value) -> bool {
        match &mut self.objects_mut()[obj.index()].dict {
            Some(InstanceDict::Split {
                values, version, ..
            }) if index < values.len() => {
                values[index] = value;
                *version = VersionTag::next();
                true
            }
            _ => false,
        }
    }

    fn dict_find(&self, obj: ObjectId, name: &str) -> Option<usize> {
        self.generic_dict(obj)?.find(name).map(|(index, _)| index)
    }

    fn dict_entry(&self, obj: ObjectId, index: usize, name: &str) -> Option<Value> {
        self.generic_dict(obj)?.entry_at(index, name).cloned()
    }

    fn slot_value(&self, obj: ObjectId, slot: usize) -> Option<Value> {
        self.objects()[obj.index()].slots.get(slot).cloned().flatten()
    }

    fn resolve_global(
        &self,
        name: &str,
        globals: NamespaceId,
        builtins: NamespaceId,
    ) -> RuntimeResult<GlobalLookup> {
        Heap::resolve_global(self, name, globals, builtins)
    }

    fn resolve_attribute(&self, obj: &Value, name: &str) -> RuntimeResult<Value> {
        self.get_attribute(obj, name)
    }

    fn resolve_method(&self, obj: &Value, name: &str) -> RuntimeResult<MethodLookup> {
        self.load_method(obj, name)
    }

    fn store_attribute(&mut self, obj: &Value, name: &str, value: Value) -> RuntimeResult<()> {
        self.set_attribute(obj, name, value)
    }
}
