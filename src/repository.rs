use serde::Serialize;

use crate::ClientError;
use crate::resource::{ApiRequest, Call, Resource};
use crate::xml::{self, Fields};

pub(crate) const REPOSITORY: Resource = Resource {
    element: "repository",
    collection: "repositories",
    prefix: "appliances/{appliance_id}/",
    prefix_params: &["appliance_id"],
};

/// A software repository assigned to an appliance.
///
/// Studio has no delete endpoint for this resource; removal goes through the
/// owning appliance's `remove_repository` command, which is why the owner id
/// is kept here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub id: u64,
    /// Appliance this repository was listed for.
    pub appliance_id: u64,
    pub name: Option<String>,
    pub repo_type: Option<String>,
    pub base_system: Option<String>,
    pub base_url: Option<String>,
}

impl Repository {
    fn from_fields(fields: &Fields<'_>, appliance_id: u64) -> Result<Self, ClientError> {
        Ok(Self {
            id: fields.required_number("id")?,
            appliance_id,
            name: fields.string("name"),
            repo_type: fields.string("type"),
            base_system: fields.string("base_system"),
            base_url: fields.string("base_url"),
        })
    }
}

pub(crate) fn list(appliance_id: u64) -> Result<Call<Vec<Repository>>, ClientError> {
    let path = REPOSITORY.collection_path(&[("appliance_id", &appliance_id.to_string())])?;
    Ok(Call::new(ApiRequest::get(path), move |body| {
        xml::decode_list(body, REPOSITORY.element, |fields| {
            Repository::from_fields(fields, appliance_id)
        })
    }))
}

/// Repository ids accepted by the add/remove repository commands.
///
/// Implemented for a single id and for slices, arrays and vectors of anything
/// implementing it, so nested lists are flattened in order.
pub trait RepositoryIds {
    /// Appends the ids to `ids`, depth first.
    fn collect_ids(self, ids: &mut Vec<u64>);

    /// Flattens into a plain list.
    fn into_ids(self) -> Vec<u64>
    where
        Self: Sized,
    {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }
}

impl RepositoryIds for u64 {
    fn collect_ids(self, ids: &mut Vec<u64>) {
        ids.push(self);
    }
}

impl RepositoryIds for &Repository {
    fn collect_ids(self, ids: &mut Vec<u64>) {
        ids.push(self.id);
    }
}

impl<T: RepositoryIds> RepositoryIds for Vec<T> {
    fn collect_ids(self, ids: &mut Vec<u64>) {
        for item in self {
            item.collect_ids(ids);
        }
    }
}

impl<T: RepositoryIds, const N: usize> RepositoryIds for [T; N] {
    fn collect_ids(self, ids: &mut Vec<u64>) {
        for item in self {
            item.collect_ids(ids);
        }
    }
}

impl<T: RepositoryIds + Clone> RepositoryIds for &[T] {
    fn collect_ids(self, ids: &mut Vec<u64>) {
        for item in self {
            item.clone().collect_ids(ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RepositoryIds, list};

    #[test]
    fn single_flat_and_nested_ids_flatten_identically() {
        let expected = vec![5678, 34, 56];
        assert_eq!(vec![5678_u64, 34, 56].into_ids(), expected);
        assert_eq!([5678_u64, 34, 56].into_ids(), expected);
        assert_eq!(vec![vec![5678_u64], vec![34, 56]].into_ids(), expected);
        assert_eq!(vec![5678_u64, 34, 56].as_slice().into_ids(), expected);
        assert_eq!(5678_u64.into_ids(), vec![5678]);
    }

    #[test]
    fn listed_repositories_remember_their_appliance() {
        let call = list(24).expect("call builds");
        assert_eq!(call.request.path, "appliances/24/repositories");
        let body = r"<repositories>
  <repository>
    <id>6345</id>
    <name>openSUSE 11.1 OSS</name>
    <type>rpm-md</type>
    <base_system>11.1</base_system>
    <base_url>http://download.opensuse.org/distribution/11.1/repo/oss/</base_url>
  </repository>
</repositories>";
        let repositories = call.finish(Ok(body.to_owned())).expect("decodes");
        assert_eq!(repositories.len(), 1);
        assert_eq!(repositories[0].id, 6345);
        assert_eq!(repositories[0].appliance_id, 24);
        assert_eq!(repositories[0].repo_type.as_deref(), Some("rpm-md"));
    }
}
