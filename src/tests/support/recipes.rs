// Throwaway local recipe repositories.

use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

use crate::repository::Repository;

pub const HELLO_WORKLOAD: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_0000000000a1);

pub const SECRET_WORKLOAD: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_0000000000b2);

pub const HELLO_RECIPE: &str = r#"
description: hello world
chart: charts/helloworld
version: "0.1.0"
values:
  replicas: 1
restricted: false
"#;

pub const SECRET_RECIPE: &str = r#"
chart: charts/secret
version: "1.2.3"
"#;

/// A temporary repository holding the given `{uuid}.yaml` documents. Keep the
/// returned directory alive for as long as the repository is used.
pub fn recipe_repository(recipes: &[(Uuid, &str)]) -> (TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    for (id, text) in recipes {
        fs::write(dir.path().join(format!("{}.yaml", id)), text).unwrap();
    }
    let repository = Repository::new(dir.path().to_str().unwrap()).unwrap();
    (dir, repository)
}

pub fn hello_repository() -> (TempDir, Repository) {
    recipe_repository(&[(HELLO_WORKLOAD, HELLO_RECIPE)])
}

/// Hello world plus a restricted recipe.
pub fn site_repository() -> (TempDir, Repository) {
    recipe_repository(&[(HELLO_WORKLOAD, HELLO_RECIPE), (SECRET_WORKLOAD, SECRET_RECIPE)])
}
