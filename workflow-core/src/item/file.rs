use super::collection::{ItemCollection, ITEM_FILE, ITEM_FILE_COUNT, ITEM_FILE_NAMES};
use super::value::Value;
use std::collections::BTreeMap;

/// One file attachment: `name -> [contentType, bytes, attributes]`
/// (spec §3.1).
#[derive(Clone, Debug, PartialEq)]
pub struct FileData {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub attributes: BTreeMap<String, Vec<Value>>,
}

impl FileData {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
            attributes: BTreeMap::new(),
        }
    }

    fn to_value(&self) -> Value {
        let attrs: BTreeMap<String, Vec<Value>> = self.attributes.clone();
        Value::List(vec![
            Value::Str(self.content_type.clone()),
            Value::Bytes(self.data.clone()),
            Value::Map(attrs),
        ])
    }

    fn from_value(name: &str, v: &Value) -> Option<FileData> {
        let Value::List(parts) = v else { return None };
        let content_type = parts.first().and_then(Value::as_str).unwrap_or("").to_string();
        let data = match parts.get(1) {
            Some(Value::Bytes(b)) => b.clone(),
            _ => Vec::new(),
        };
        let attributes = match parts.get(2) {
            Some(Value::Map(m)) => m.clone(),
            _ => BTreeMap::new(),
        };
        Some(FileData {
            name: name.to_string(),
            content_type,
            data,
            attributes,
        })
    }
}

/// Extension trait adding the `$file` sub-model operations to
/// `ItemCollection` (spec §3.1, §8 invariant 6).
pub trait FileAttachments {
    fn add_file_data(&mut self, file: FileData);
    fn get_file_data(&self, name: &str) -> Option<FileData>;
    fn remove_file(&mut self, name: &str);
    fn file_names(&self) -> Vec<String>;
}

impl FileAttachments for ItemCollection {
    fn add_file_data(&mut self, file: FileData) {
        let mut map = file_map(self);
        map.insert(file.name.clone(), file.to_value());
        write_file_map(self, map);
    }

    fn get_file_data(&self, name: &str) -> Option<FileData> {
        let map = file_map(self);
        map.get(name).and_then(|v| FileData::from_value(name, v))
    }

    fn remove_file(&mut self, name: &str) {
        let mut map = file_map(self);
        map.remove(name);
        write_file_map(self, map);
    }

    fn file_names(&self) -> Vec<String> {
        file_map(self).keys().cloned().collect()
    }
}

fn file_map(w: &ItemCollection) -> BTreeMap<String, Value> {
    match w.get_item_value(ITEM_FILE).into_iter().next() {
        Some(Value::Map(m)) => m
            .into_iter()
            .filter_map(|(k, mut vs)| if vs.is_empty() { None } else { Some((k, vs.remove(0))) })
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Writes the `$file` map back, purging duplicate/null entries and keeping
/// `$file.count`/`$file.names` consistent, per spec §3.1: "Files are purged
/// of duplicate/null entries before every write of `$file`."
fn write_file_map(w: &mut ItemCollection, map: BTreeMap<String, Value>) {
    let mut cleaned: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut names: Vec<String> = Vec::new();
    for (name, value) in map {
        if name.trim().is_empty() {
            continue;
        }
        if cleaned.contains_key(&name) {
            continue;
        }
        names.push(name.clone());
        cleaned.insert(name, vec![value]);
    }
    w.set_item_value(ITEM_FILE, Value::Map(cleaned.clone()));
    w.set_item_value(ITEM_FILE_COUNT, Value::I64(cleaned.len() as i64));
    w.set_item_value(
        ITEM_FILE_NAMES,
        Value::List(names.into_iter().map(Value::Str).collect()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_keeps_count_and_names_consistent() {
        let mut w = ItemCollection::new();
        w.add_file_data(FileData::new("a.pdf", "application/pdf", vec![1, 2, 3]));
        w.add_file_data(FileData::new("b.txt", "text/plain", vec![4]));

        let got = w.get_file_data("a.pdf").unwrap();
        assert_eq!(got.data, vec![1, 2, 3]);
        assert_eq!(w.get_item_value_long("$file.count"), 2);

        let mut names = w.file_names();
        names.sort();
        assert_eq!(names, vec!["a.pdf".to_string(), "b.txt".to_string()]);

        w.remove_file("a.pdf");
        assert_eq!(w.get_item_value_long("$file.count"), 1);
        assert!(w.get_file_data("a.pdf").is_none());
    }

    #[test]
    fn names_are_free_of_duplicates() {
        let mut w = ItemCollection::new();
        w.add_file_data(FileData::new("dup.txt", "text/plain", vec![1]));
        w.add_file_data(FileData::new("dup.txt", "text/plain", vec![2]));
        assert_eq!(w.file_names().len(), 1);
        assert_eq!(w.get_item_value_long("$file.count"), 1);
    }
}
