use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};
use crate::ids::is_valid_id;
use crate::object::{impl_data_object, Id, ObjectFields, ObjectType};
use crate::root::DataRoot;
use crate::updatable::Updatable;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstituencyData {
    pub id: Id,
    #[serde(flatten)]
    pub common: ObjectFields,
    /// A broader constituency that this one belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct Constituency {
    id: Id,
    data: ConstituencyData,
    updates: Updatable<Constituency>,
}

impl_data_object!(Constituency, ObjectType::Constituency);

impl Constituency {
    /// # Errors
    /// Returns [`DataError::Provision`] if the id is blank or the constituency is its own parent.
    pub fn new(data: ConstituencyData) -> DataResult<Self> {
        if !is_valid_id(&data.id) {
            return Err(DataError::provision("constituency id MUST NOT be blank"));
        }
        if data.parent_id.as_deref() == Some(data.id.as_str()) {
            return Err(DataError::provision(format!(
                "constituency `{}` MUST NOT be its own parent",
                data.id
            )));
        }
        Ok(Self { id: data.id.clone(), data, updates: Updatable::new() })
    }

    #[must_use]
    pub fn data(&self) -> &ConstituencyData {
        &self.data
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.data.parent_id.as_deref()
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        self.data.keywords.as_deref().unwrap_or_default()
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if `parentId` does not resolve.
    pub fn parent<'r>(&self, root: &'r DataRoot) -> DataResult<Option<&'r Constituency>> {
        self.parent_id().map(|id| root.constituency(id)).transpose()
    }

    /// Parent first, then the parent's parent and so on.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] for a dangling `parentId` and
    /// [`DataError::Provision`] if the chain loops.
    pub fn ancestors<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Constituency>> {
        let mut ancestors: Vec<&'r Constituency> = Vec::new();
        let mut next = self.parent(root)?;
        while let Some(parent) = next {
            if parent.id == self.id || ancestors.iter().any(|seen| seen.id == parent.id) {
                return Err(DataError::provision(format!(
                    "constituency `{}` has a cyclic parent chain",
                    self.id
                )));
            }
            ancestors.push(parent);
            next = parent.parent(root)?;
        }
        Ok(ancestors)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstituencyGroupData {
    pub id: Id,
    #[serde(flatten)]
    pub common: ObjectFields,
    pub constituency_ids: Vec<Id>,
}

/// The constituencies a voter picks from in one election.
#[derive(Debug)]
pub struct ConstituencyGroup {
    id: Id,
    data: ConstituencyGroupData,
    updates: Updatable<ConstituencyGroup>,
}

impl_data_object!(ConstituencyGroup, ObjectType::ConstituencyGroup);

impl ConstituencyGroup {
    /// Every listed constituency MUST already exist in `root`.
    ///
    /// # Errors
    /// Returns [`DataError::Provision`] for a blank id or a missing constituency.
    pub fn new(data: ConstituencyGroupData, root: &DataRoot) -> DataResult<Self> {
        if !is_valid_id(&data.id) {
            return Err(DataError::provision("constituency group id MUST NOT be blank"));
        }
        if let Some(missing) = data.constituency_ids.iter().find(|id| root.constituency(id).is_err()) {
            return Err(DataError::provision(format!(
                "constituency group `{}` references missing constituency `{missing}`",
                data.id
            )));
        }
        Ok(Self { id: data.id.clone(), data, updates: Updatable::new() })
    }

    #[must_use]
    pub fn data(&self) -> &ConstituencyGroupData {
        &self.data
    }

    #[must_use]
    pub fn constituency_ids(&self) -> &[Id] {
        &self.data.constituency_ids
    }

    #[must_use]
    pub fn contains(&self, constituency_id: &str) -> bool {
        self.data.constituency_ids.iter().any(|id| id == constituency_id)
    }

    /// # Errors
    /// Returns [`DataError::NotFound`] if a member id does not resolve.
    pub fn constituencies<'r>(&self, root: &'r DataRoot) -> DataResult<Vec<&'r Constituency>> {
        self.data.constituency_ids.iter().map(|id| root.constituency(id)).collect()
    }

    #[must_use]
    pub fn single_constituency<'r>(&self, root: &'r DataRoot) -> Option<&'r Constituency> {
        match self.data.constituency_ids.as_slice() {
            [only] => root.constituency(only).ok(),
            _ => None,
        }
    }

    /// True when every constituency of `other` is in this group or has an ancestor here.
    #[must_use]
    pub fn implied_by(&self, root: &DataRoot, other: &ConstituencyGroup) -> bool {
        if self.id == other.id {
            return true;
        }
        let Ok(constituencies) = other.constituencies(root) else {
            return false;
        };
        !constituencies.is_empty()
            && constituencies
                .into_iter()
                .all(|constituency| self.implied_constituency(root, constituency).is_some())
    }

    /// `constituency` itself or its nearest ancestor that belongs to this group.
    #[must_use]
    pub fn implied_constituency<'r>(
        &self,
        root: &'r DataRoot,
        constituency: &'r Constituency,
    ) -> Option<&'r Constituency> {
        if self.contains(&constituency.id) {
            return Some(constituency);
        }
        constituency
            .ancestors(root)
            .ok()?
            .into_iter()
            .find(|ancestor| self.contains(&ancestor.id))
    }
}
