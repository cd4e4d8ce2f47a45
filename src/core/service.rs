use crate::adapters::storage::LocalStorage;
use crate::app::inventory::Product;
use crate::app::roster::{Gender, Hostel, Person};
use crate::config::toml_config::StoreConfig;
use crate::core::format::Format;
use crate::core::store::RecordStore;
use crate::domain::model::Catalog;
use crate::domain::ports::{Entity, Storage};
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{validate_path, Validate};
use std::path::{Path, PathBuf};

/// In-memory list of entities backed by a [`RecordStore`].
///
/// The list only changes through the methods below; a failed `load` leaves it
/// untouched.
#[derive(Debug)]
pub struct EntityService<E, S: Storage = LocalStorage> {
    items: Vec<E>,
    store: RecordStore<S>,
    catalog: Catalog,
}

impl<E: Entity + Validate> EntityService<E, LocalStorage> {
    pub fn new(format: Format, path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_store(RecordStore::new(format, path))
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let store = RecordStore::new(config.format()?, config.path())
            .unknown_tags(config.store.unknown_tags);
        Self::with_store(store)
    }

    /// Service for `path` in `format`, taking the remaining store settings from
    /// `config` when one is given. Fails if the store cannot be pointed at `path`.
    pub fn open(
        format: Format,
        path: impl AsRef<Path>,
        config: Option<&StoreConfig>,
    ) -> Result<Self> {
        let path = path.as_ref();
        validate_path("file", &path.to_string_lossy())?;
        let service = match config {
            Some(config) => Self::from_config(config)?,
            None => Self::new(format, path)?,
        };
        if !service.repoint(format, path) {
            return Err(StoreError::InvalidConfigValue {
                field: "file".to_string(),
                value: path.display().to_string(),
                reason: "the store rejected this data file".to_string(),
            });
        }
        Ok(service)
    }
}

impl<E: Entity + Validate, S: Storage> EntityService<E, S> {
    pub fn with_store(store: RecordStore<S>) -> Result<Self> {
        Ok(Self {
            items: Vec::new(),
            store,
            catalog: Catalog::new(E::shapes())?,
        })
    }

    pub fn add(&mut self, entity: E) -> Result<()> {
        entity.validate()?;
        self.items.push(entity);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.items.remove(index);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.items.get_mut(index)
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Writes every entity to the store. Returns how many were written.
    pub fn save(&self) -> Result<usize> {
        self.items.iter().try_for_each(Validate::validate)?;
        let records: Vec<_> = self.items.iter().map(E::to_record).collect();
        self.store.save(&records, &self.catalog)?;
        tracing::info!(
            path = %self.store.path().display(),
            format = %self.store.format(),
            "saved {} entities",
            records.len()
        );
        Ok(records.len())
    }

    /// Replaces the in-memory list with the store's contents.
    pub fn load(&mut self) -> Result<usize> {
        let records = self.store.load(&self.catalog)?;
        let items = records
            .iter()
            .map(|record| {
                let entity = E::from_record(record)?;
                entity.validate()?;
                Ok(entity)
            })
            .collect::<Result<Vec<_>>>()?;
        self.items = items;
        tracing::info!(
            path = %self.store.path().display(),
            format = %self.store.format(),
            "loaded {} entities",
            self.items.len()
        );
        Ok(self.items.len())
    }

    pub fn set_path(&self, path: impl AsRef<Path>) -> bool {
        self.store.set_path(path)
    }

    pub fn change_format(&self, format: Format) -> bool {
        self.store.set_format(format)
    }

    pub fn repoint(&self, format: Format, path: impl AsRef<Path>) -> bool {
        self.store.repoint(format, path)
    }

    pub fn path(&self) -> PathBuf {
        self.store.path()
    }

    pub fn format(&self) -> Format {
        self.store.format()
    }

    pub fn is_locked(&self) -> bool {
        self.store.is_locked()
    }

    pub fn file_exists(&self) -> bool {
        self.store.exists()
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }
}

impl<S: Storage> EntityService<Product, S> {
    pub fn total_stock_value(&self) -> f64 {
        self.items.iter().map(Product::total_cost).sum()
    }

    /// Raises one product's price by `percentage` percent. `Ok(false)` when the
    /// index is out of range.
    pub fn increase_price(&mut self, index: usize, percentage: f64) -> Result<bool> {
        match self.items.get_mut(index) {
            Some(product) => {
                product.increase_price(percentage)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<S: Storage> EntityService<Person, S> {
    /// Gives every student without a hostel room the next free room for their
    /// gender. Returns the indices of the students who moved in.
    pub fn settle_students_in_hostel(&mut self) -> Vec<usize> {
        let mut hostel = Hostel::after(&self.items);
        let mut settled = Vec::new();
        for (i, person) in self.items.iter_mut().enumerate() {
            if person.lives_in_hostel() {
                continue;
            }
            if let Person::Student {
                info, residence, ..
            } = person
            {
                *residence = hostel.assign(info.gender);
                tracing::debug!(
                    student = %format!("{} {}", info.first_name, info.last_name),
                    room = %residence.as_str(),
                    "settled student"
                );
                settled.push(i);
            }
        }
        settled
    }

    /// `Ok(false)` when the index is out of range.
    pub fn practice_music(&mut self, index: usize) -> Result<bool> {
        let Some(person) = self.items.get_mut(index) else {
            return Ok(false);
        };
        if !person.practice() {
            return Err(StoreError::Validation {
                field: "index".to_string(),
                value: index.to_string(),
                reason: format!("{} is not a musician", person.tag()),
            });
        }
        Ok(true)
    }

    /// First-year female students living in the hostel, with their indices.
    pub fn first_year_female_hostel_residents(&self) -> Vec<(usize, &Person)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, person)| {
                person.lives_in_hostel()
                    && person.info().gender == Gender::Female
                    && matches!(person, Person::Student { year: 1, .. })
            })
            .collect()
    }
}
