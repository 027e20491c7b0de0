//! JSON documents as reflected values
//!
//! A document is an ordinary [`SharedObject`] tree: objects are
//! [`JsonMap`]s, arrays are [`JsonVec`]s and leaves are `i64`, `f64`,
//! `bool` or `String`. Every access goes through the registry, so the
//! registry must carry the built-in types (see [`Registry::with_builtins`]).
//!
//! ```ignore
//! let registry = Registry::with_builtins();
//! let doc = Json::parse(&registry, r#"{"a": {"arr": [1, 2, "hello"]}}"#);
//! assert_eq!(doc.get("a").get("arr").at(2).as_str().as_deref(), Some("hello"));
//! ```

mod parse;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use tracing::debug;

use crate::format;
use crate::meta::MetaMethod;
use crate::object::{ObjectPtr, SharedObject};
use crate::registry::Registry;
use crate::types::{convert_value, TypeIdentity};

pub use parse::ParseIssue;

/// Object node
pub type JsonMap = BTreeMap<String, SharedObject>;

/// Array node
pub type JsonVec = Vec<SharedObject>;

/// A document, or a member or element of one
///
/// A handle obtained through [`get`](Json::get) or [`at`](Json::at)
/// remembers the container entry it was read from, so
/// [`assign`](Json::assign) replaces the value inside the document.
#[derive(Clone)]
pub struct Json {
    registry: Registry,
    obj: SharedObject,
    entry: Option<ObjectPtr>,
}

impl Json {
    pub fn new(registry: &Registry, obj: SharedObject) -> Self {
        Self {
            registry: registry.clone(),
            obj,
            entry: None,
        }
    }

    pub fn null(registry: &Registry) -> Self {
        Self::new(registry, SharedObject::null())
    }

    pub fn new_map(registry: &Registry) -> Self {
        Self::new(registry, SharedObject::new(JsonMap::new()))
    }

    pub fn new_vec(registry: &Registry) -> Self {
        Self::new(registry, SharedObject::new(JsonVec::new()))
    }

    /// A leaf holding `value`
    pub fn scalar<T: Any + Send>(registry: &Registry, value: T) -> Self {
        Self::new(registry, SharedObject::new(value))
    }

    /// Read a document, reporting structural problems to the registry's
    /// diagnostics and keeping whatever could be recovered
    pub fn parse(registry: &Registry, text: &str) -> Self {
        let (doc, issues) = Self::parse_with_issues(registry, text);
        for issue in &issues {
            registry.report(format_args!("Error when parsing JSON: {issue}"));
        }
        doc
    }

    /// Read a document and hand the problems back instead of reporting them
    pub fn parse_with_issues(registry: &Registry, text: &str) -> (Self, Vec<ParseIssue>) {
        let (obj, issues) = parse::Parser::new(text).parse_document();
        debug!(issues = issues.len(), "Parsed JSON document");
        (Self::new(registry, obj), issues)
    }

    pub fn read_from<R: Read>(registry: &Registry, mut reader: R) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(registry, &text))
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.to_string().as_bytes())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn object(&self) -> &SharedObject {
        &self.obj
    }

    pub fn into_object(self) -> SharedObject {
        self.obj
    }

    pub fn is_null(&self) -> bool {
        self.obj.is_null()
    }

    pub fn is_map(&self) -> bool {
        self.obj.is::<JsonMap>()
    }

    pub fn is_vec(&self) -> bool {
        self.obj.is::<JsonVec>()
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_null() && !self.is_map() && !self.is_vec()
    }

    /// Wrap the value held by a container entry view
    fn from_entry(&self, view: SharedObject) -> Self {
        let entry = view.is::<SharedObject>().then(|| view.as_ptr());
        Self {
            registry: self.registry.clone(),
            obj: view.to_shared(),
            entry,
        }
    }

    /// Member `key`; a missing member is created as null
    pub fn get(&self, key: &str) -> Json {
        let key = SharedObject::new(key.to_string());
        let view = self
            .registry
            .operate(&self.obj, MetaMethod::Index, &[key.as_ptr()]);
        self.from_entry(view)
    }

    /// Element `index`, null when out of range or not an array
    pub fn at(&self, index: usize) -> Json {
        if !self.is_vec() || index >= self.len() {
            return Self::null(&self.registry);
        }
        let index = SharedObject::new(index);
        let view = self
            .registry
            .operate(&self.obj, MetaMethod::Index, &[index.as_ptr()]);
        self.from_entry(view)
    }

    /// Set member `key` of an object; on an array the key is ignored and
    /// the value is appended
    pub fn add_item(&self, key: &str, value: Json) -> bool {
        if self.is_vec() {
            return self.push_item(value);
        }
        let key = SharedObject::new(key.to_string());
        let done = self
            .registry
            .call(&self.obj, "insert", &[key.as_ptr(), value.obj.as_ptr()]);
        self.settle(done)
    }

    /// Append to an array
    pub fn push_item(&self, value: Json) -> bool {
        let done = self
            .registry
            .call(&self.obj, "push_back", &[value.obj.as_ptr()]);
        self.settle(done)
    }

    /// Remove member `key`; false when it was absent
    pub fn remove_item(&self, key: &str) -> bool {
        let key = SharedObject::new(key.to_string());
        let removed = self.registry.call(&self.obj, "erase", &[key.as_ptr()]);
        self.removed(removed)
    }

    /// Remove element `index`; false when out of range
    pub fn remove_at(&self, index: usize) -> bool {
        let index = SharedObject::new(index);
        let removed = self.registry.call(&self.obj, "erase", &[index.as_ptr()]);
        self.removed(removed)
    }

    fn settle(&self, result: crate::error::ReflectResult<SharedObject>) -> bool {
        match result {
            Ok(_) => true,
            Err(err) => {
                self.registry.report(err);
                false
            }
        }
    }

    fn removed(&self, result: crate::error::ReflectResult<SharedObject>) -> bool {
        match result.and_then(|out| out.get::<bool>()) {
            Ok(removed) => removed,
            Err(err) => {
                self.registry.report(err);
                false
            }
        }
    }

    /// Members of an object or elements of an array; zero for leaves
    pub fn len(&self) -> usize {
        if !self.is_map() && !self.is_vec() {
            return 0;
        }
        self.registry
            .call(&self.obj, "size", &[])
            .and_then(|size| size.get::<usize>())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member names of an object in order
    pub fn keys(&self) -> Vec<String> {
        if !self.is_map() {
            return Vec::new();
        }
        self.registry
            .call(&self.obj, "keys", &[])
            .and_then(|keys| keys.get::<Vec<String>>())
            .unwrap_or_default()
    }

    /// Visit members (with their names) or elements (without)
    pub fn for_each(&self, mut f: impl FnMut(Option<&str>, Json)) {
        if self.is_map() {
            for key in self.keys() {
                let value = self.get(&key);
                f(Some(&key), value);
            }
        } else if self.is_vec() {
            for index in 0..self.len() {
                f(None, self.at(index));
            }
        }
    }

    /// Replace this value with a leaf
    ///
    /// A member or element is replaced inside its document; a standalone
    /// handle just takes the new value.
    pub fn assign<T: Any + Send>(&mut self, value: T) {
        let obj = SharedObject::new(value);
        if let Some(entry) = &self.entry {
            if let Err(err) = entry.set(obj.clone()) {
                self.registry.report(err);
            }
        }
        self.obj = obj;
    }

    fn numeric<T: Any + Clone>(&self) -> Option<T> {
        if let Ok(value) = self.obj.get::<T>() {
            return Some(value);
        }
        let from = self.obj.identity();
        let to = TypeIdentity::of::<T>();
        let boxed = self
            .obj
            .with_any(|value| convert_value(&*value, &from, &to))
            .ok()??;
        boxed.downcast_ref::<T>().cloned()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.numeric::<i64>()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.numeric::<f64>()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.obj.get::<bool>().ok()
    }

    pub fn as_str(&self) -> Option<String> {
        self.obj.get::<String>().ok()
    }

    /// Convert into a `serde_json` tree
    ///
    /// Leaves of other types become their printed text.
    pub fn to_value(&self) -> serde_json::Value {
        use serde_json::Value;

        if self.is_null() {
            return Value::Null;
        }
        if self.is_map() {
            let mut members = serde_json::Map::new();
            self.for_each(|key, value| {
                if let Some(key) = key {
                    members.insert(key.to_string(), value.to_value());
                }
            });
            return Value::Object(members);
        }
        if self.is_vec() {
            let mut items = Vec::new();
            self.for_each(|_, value| items.push(value.to_value()));
            return Value::Array(items);
        }
        if let Some(flag) = self.as_bool() {
            return Value::Bool(flag);
        }
        if let Some(text) = self.as_str() {
            return Value::String(text);
        }
        if self.obj.is::<f64>() || self.obj.is::<f32>() {
            return self
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number);
        }
        if let Some(int) = self.as_i64() {
            return Value::Number(int.into());
        }
        Value::String(self.registry.stringify(&self.obj))
    }

    /// Build a document from a `serde_json` tree
    pub fn from_value(registry: &Registry, value: &serde_json::Value) -> Self {
        use serde_json::Value;

        let obj = match value {
            Value::Null => SharedObject::null(),
            Value::Bool(flag) => SharedObject::new(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(int) => SharedObject::new(int),
                None => SharedObject::new(number.as_f64().unwrap_or_default()),
            },
            Value::String(text) => SharedObject::new(text.clone()),
            Value::Array(items) => SharedObject::new(
                items
                    .iter()
                    .map(|item| Self::from_value(registry, item).obj)
                    .collect::<JsonVec>(),
            ),
            Value::Object(members) => SharedObject::new(
                members
                    .iter()
                    .map(|(key, item)| (key.clone(), Self::from_value(registry, item).obj))
                    .collect::<JsonMap>(),
            ),
        };
        Self::new(registry, obj)
    }
}

/// Documents print through the registry printers, using its JSON settings
impl fmt::Display for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format::element(&self.registry, &self.obj))
    }
}

impl fmt::Debug for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Json").field("value", &self.obj).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReflectConfig;

    fn compact() -> Registry {
        let mut config = ReflectConfig::default();
        config.json.indent = false;
        config.echo_stderr = false;
        let registry = Registry::with_config(config);
        crate::builtins::init(&registry);
        registry
    }

    #[test]
    fn test_round_trip() {
        let registry = compact();
        let text = r#"{"a": {"arr": [1, 2, "hello"]}}"#;
        let doc = Json::parse(&registry, text);
        assert_eq!(doc.to_string(), r#"{ "a": { "arr": [ 1, 2, "hello" ] } }"#);

        let again = Json::parse(&registry, &doc.to_string());
        assert_eq!(again.to_value(), doc.to_value());
        assert_eq!(doc.get("a").get("arr").at(2).as_str().as_deref(), Some("hello"));
    }

    #[test]
    fn test_mutation() {
        let registry = compact();
        let doc = Json::parse(&registry, "{\"a\":1}");
        assert!(doc.remove_item("a"));
        assert!(doc.add_item("b", Json::new_vec(&registry)));
        assert!(doc.get("b").push_item(Json::scalar(&registry, 5i64)));
        assert_eq!(doc.to_string(), r#"{ "b": [ 5 ] }"#);
        assert_eq!(doc.to_value(), serde_json::json!({"b": [5]}));

        assert!(doc.get("b").remove_at(0));
        assert!(!doc.get("b").remove_at(0));
        assert!(doc.remove_item("b"));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_missing_member_is_created() {
        let registry = compact();
        let doc = Json::new_map(&registry);
        assert!(doc.get("ghost").is_null());
        assert_eq!(doc.keys(), vec!["ghost".to_string()]);
        assert_eq!(doc.to_string(), r#"{ "ghost": null }"#);
    }

    #[test]
    fn test_pretty_output_is_valid_json() {
        let registry = Registry::with_builtins();
        let text = r#"{"name": "a \"q\"", "list": [1.5, -2, true], "nested": {"x": {}}}"#;
        let doc = Json::parse(&registry, text);
        let printed = doc.to_string();
        assert!(printed.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(parsed, serde_json::from_str::<serde_json::Value>(text).unwrap());
    }

    #[test]
    fn test_serde_conversion() {
        let registry = compact();
        let value = serde_json::json!({"k": [1, 2.5, "s", null, false]});
        let doc = Json::from_value(&registry, &value);
        assert_eq!(doc.get("k").len(), 5);
        assert_eq!(doc.get("k").at(1).as_f64(), Some(2.5));
        assert_eq!(doc.get("k").at(0).as_f64(), Some(1.0));
        assert_eq!(doc.to_value(), value);
    }

    #[test]
    fn test_parse_issues_are_reported() {
        let registry = compact();
        let doc = Json::parse(&registry, "[1 2]");
        assert_eq!(doc.len(), 2);
        let recent = registry.diagnostics().recent();
        assert!(recent.iter().any(|line| line.contains("expecting ',' or ']'")));
    }

    #[test]
    fn test_index_out_of_range_is_null() {
        let registry = compact();
        let doc = Json::parse(&registry, "[1]");
        let missing = doc.at(5);
        assert!(missing.is_null());
        assert!(!missing.is_scalar());
        assert_eq!(missing.to_string(), "null");
        assert!(doc.get("a").at(0).is_null());
        assert_eq!(doc.at(0).as_i64(), Some(1));
    }

    #[test]
    fn test_assign_writes_into_document() {
        let registry = compact();
        let doc = Json::parse(&registry, "{\"a\":1,\"list\":[1,2]}");
        let mut member = doc.get("a");
        member.assign(5i64);
        assert_eq!(member.as_i64(), Some(5));
        assert_eq!(doc.get("a").as_i64(), Some(5));

        let mut element = doc.get("list").at(1);
        element.assign(String::from("two"));
        assert_eq!(doc.to_string(), r#"{ "a": 5, "list": [ 1, "two" ] }"#);

        let mut standalone = Json::scalar(&registry, 1i64);
        standalone.assign(true);
        assert_eq!(standalone.as_bool(), Some(true));
    }

    #[test]
    fn test_add_item_appends_to_arrays() {
        let registry = compact();
        let doc = Json::new_vec(&registry);
        assert!(doc.add_item("ignored", Json::scalar(&registry, 1i64)));
        assert!(doc.push_item(Json::scalar(&registry, 2i64)));
        assert_eq!(doc.to_string(), "[ 1, 2 ]");
    }

    #[test]
    fn test_write_to() {
        let registry = compact();
        let doc = Json::read_from(&registry, "[\"x\"]".as_bytes()).unwrap();
        let mut out = Vec::new();
        doc.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[ \"x\" ]");
    }
}
