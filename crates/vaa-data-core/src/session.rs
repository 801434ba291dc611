//! A registry bound to a locale, rebuilt from the retained source when the locale changes.

use serde_json::Value;

use crate::document::FullVaaData;
use crate::error::{DataError, DataResult};
use crate::root::{DataRoot, RootGeneration, RootOptions};
use crate::translate::translate;

#[derive(Debug)]
pub struct DataSession {
    source: Value,
    root: DataRoot,
}

impl DataSession {
    /// Translate `source` for the configured locale and provision a root from it. Without a
    /// locale every localized value resolves to its first translation.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] if the translated document does not have the ingest
    /// shape or fails to provision.
    pub fn new(source: Value, options: RootOptions) -> DataResult<Self> {
        let root = build_root(&source, options)?;
        Ok(Self { source, root })
    }

    #[must_use]
    pub fn root(&self) -> &DataRoot {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut DataRoot {
        &mut self.root
    }

    #[must_use]
    pub fn source(&self) -> &Value {
        &self.source
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.root.locale()
    }

    #[must_use]
    pub fn generation(&self) -> RootGeneration {
        self.root.generation()
    }

    /// Replace the root with one built for `locale` and dispose the old one. The current
    /// root is kept if the new one cannot be built.
    ///
    /// # Errors
    /// Returns the error raised while building the new root.
    pub fn set_locale(&mut self, locale: Option<String>) -> DataResult<RootGeneration> {
        if locale.as_deref() == self.locale() {
            return Ok(self.generation());
        }
        let options = RootOptions { locale, ..self.root.options().clone() };
        let fresh = build_root(&self.source, options)?;
        let previous = std::mem::replace(&mut self.root, fresh);
        let previous_generation = previous.generation();
        let released = previous.dispose();
        tracing::debug!(
            previous = previous_generation.get(),
            current = self.root.generation().get(),
            locale = ?self.root.locale(),
            released,
            "swapped data root"
        );
        Ok(self.root.generation())
    }

    #[must_use]
    pub fn into_root(self) -> DataRoot {
        self.root
    }
}

fn build_root(source: &Value, options: RootOptions) -> DataResult<DataRoot> {
    let localized = translate(source.clone(), options.locale.as_deref().unwrap_or_default());
    let data: FullVaaData = serde_json::from_value(localized).map_err(|err| {
        DataError::provision(format!("data document MUST have the ingest shape: {err}"))
    })?;
    DataRoot::from_data(data, options)
}
