//! This module provides a preference store, that can be backed by a local file

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::notification::{Observer, ObserverId, ObserverList};
use crate::traits::{Observable, PreferenceStore};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum PrefValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Preferences, optionally stored in a JSON file.
///
/// Every change is saved to the backing file (if any), then notified to observers
#[derive(Debug)]
pub struct Preferences {
    backing_file: Option<PathBuf>,
    values: Mutex<HashMap<String, PrefValue>>,
    observers: ObserverList,
}

impl Preferences {
    /// Preferences that are not saved anywhere
    pub fn new_in_memory() -> Self {
        Self {
            backing_file: None,
            values: Mutex::new(HashMap::new()),
            observers: ObserverList::new(),
        }
    }

    /// Empty preferences, that will be saved to `path`
    pub fn new(path: &Path) -> Self {
        Self {
            backing_file: Some(PathBuf::from(path)),
            ..Self::new_in_memory()
        }
    }

    /// Load preferences from a valid backing file.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let values = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self {
            backing_file: Some(PathBuf::from(path)),
            values: Mutex::new(values),
            observers: ObserverList::new(),
        })
    }

    /// Store the current preferences to the backing file, if any
    pub fn save_to_file(&self) -> Result<(), Box<dyn Error>> {
        let path = match &self.backing_file {
            None => return Ok(()),
            Some(path) => path,
        };
        let file = match std::fs::File::create(path) {
            Err(err) => {
                return Err(format!("Unable to save file {:?}: {}", path, err).into());
            },
            Ok(f) => f,
        };

        let values = self.values.lock().unwrap();
        serde_json::to_writer(file, &*values)?;
        Ok(())
    }

    pub fn remove(&self, name: &str) {
        let removed = self.values.lock().unwrap().remove(name);
        if removed.is_some() {
            self.changed(name);
        }
    }

    fn get(&self, name: &str) -> Option<PrefValue> {
        self.values.lock().unwrap().get(name).cloned()
    }

    fn set(&self, name: &str, value: PrefValue) {
        let previous = self.values.lock().unwrap().insert(name.to_string(), value.clone());
        if previous != Some(value) {
            self.changed(name);
        }
    }

    fn changed(&self, name: &str) {
        log::debug!("Preference {} has changed", name);
        if let Err(err) = self.save_to_file() {
            log::warn!("Unable to save preferences: {}", err);
        }
        self.observers.notify_preference(name);
    }
}

impl Observable for Preferences {
    fn add_observer(&self, observer: Observer) {
        self.observers.add(observer);
    }

    fn remove_observer(&self, id: ObserverId) {
        self.observers.remove(id);
    }
}

impl PreferenceStore for Preferences {
    fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(PrefValue::Bool(value)) => value,
            _ => default,
        }
    }

    fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.get(name) {
            Some(PrefValue::Int(value)) => value,
            _ => default,
        }
    }

    fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(PrefValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    fn set_bool(&self, name: &str, value: bool) {
        self.set(name, PrefValue::Bool(value));
    }

    fn set_int(&self, name: &str, value: i64) {
        self.set(name, PrefValue::Int(value));
    }

    fn set_string(&self, name: &str, value: &str) {
        self.set(name, PrefValue::Str(value.to_string()));
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::notification::ViewEvent;

    #[test]
    fn test_values_and_notifications() {
        let prefs = Preferences::new_in_memory();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        prefs.add_observer(Observer::new(tx));

        assert_eq!(prefs.get_bool("calendar.view.tasksInView", true), true);
        prefs.set_bool("calendar.view.tasksInView", false);
        prefs.set_bool("calendar.view.tasksInView", false);
        assert_eq!(prefs.get_bool("calendar.view.tasksInView", true), false);
        // Wrong types fall back to the default value
        assert_eq!(prefs.get_int("calendar.view.tasksInView", 3), 3);

        prefs.set_int("calendar.week.start", 1);
        prefs.set_string("calendar.category.color.work", "#ff0000");
        assert_eq!(prefs.get_string("calendar.category.color.work").as_deref(), Some("#ff0000"));
        prefs.remove("calendar.category.color.work");
        assert!(prefs.get_string("calendar.category.color.work").is_none());

        let mut names = Vec::new();
        while let Ok(ViewEvent::Preference(name)) = rx.try_recv() {
            names.push(name);
        }
        assert_eq!(names, vec![
            "calendar.view.tasksInView",
            "calendar.week.start",
            "calendar.category.color.work",
            "calendar.category.color.work",
        ]);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("calview-prefs-{}.json", std::process::id()));
        let prefs = Preferences::new(&path);
        prefs.set_bool("calendar.view.workdaysOnly", true);
        prefs.set_int("calendar.week.start", 1);

        let loaded = Preferences::from_file(&path).unwrap();
        assert_eq!(loaded.get_bool("calendar.view.workdaysOnly", false), true);
        assert_eq!(loaded.get_int("calendar.week.start", 0), 1);
        let _ = std::fs::remove_file(&path);

        assert!(Preferences::from_file(Path::new("/does/not/exist.json")).is_err());
    }
}
