use super::OtelDistro;
use crate::error::CatalogError;
use crate::models::ProgrammingLanguage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Distro name per programming language
pub type DistroPerLanguage = BTreeMap<ProgrammingLanguage, String>;

const COMMUNITY_CATALOG: &str = include_str!("community.yaml");

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    distros: Vec<OtelDistro>,
    #[serde(default)]
    defaults: DistroPerLanguage,
}

/// Static `name -> OtelDistro` table plus the default distro for each language
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistroCatalog {
    distros: BTreeMap<String, OtelDistro>,
    defaults: DistroPerLanguage,
}

impl DistroCatalog {
    /// The catalog of open-source community distros
    pub fn community() -> Result<Self, CatalogError> {
        Self::from_yaml_str(COMMUNITY_CATALOG)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(yaml)?;

        let mut distros = BTreeMap::new();
        for distro in document.distros {
            if distros.contains_key(&distro.name) {
                return Err(CatalogError::DuplicateDistro(distro.name));
            }
            distros.insert(distro.name.clone(), distro);
        }

        let catalog = Self {
            distros,
            defaults: document.defaults,
        };
        catalog.validate_defaults()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate_defaults(&self) -> Result<(), CatalogError> {
        for (language, name) in &self.defaults {
            let distro = self.distros.get(name).ok_or_else(|| CatalogError::UnknownDefault {
                language: language.to_string(),
                distro: name.clone(),
            })?;
            if distro.language != *language {
                return Err(CatalogError::DefaultLanguageMismatch {
                    language: language.to_string(),
                    distro: name.clone(),
                    actual: distro.language.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OtelDistro> {
        self.distros.get(name)
    }

    pub fn default_distro_names(&self) -> &DistroPerLanguage {
        &self.defaults
    }

    pub fn distros(&self) -> impl Iterator<Item = &OtelDistro> {
        self.distros.values()
    }

    pub fn len(&self) -> usize {
        self.distros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distros.is_empty()
    }

    /// Adds or replaces a distro. Does not change the defaults.
    pub fn with_distro(mut self, distro: OtelDistro) -> Self {
        self.distros.insert(distro.name.clone(), distro);
        self
    }

    pub fn with_default(mut self, language: ProgrammingLanguage, name: impl Into<String>) -> Self {
        self.defaults.insert(language, name.into());
        self
    }
}
