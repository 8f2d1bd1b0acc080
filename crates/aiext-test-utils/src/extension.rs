//! `InstallAIExtension` builders.

use std::collections::BTreeMap;

use aiext_api::{ExtensionSpec, HelmSpec, InstallAIExtension, InstallAIExtensionSpec, RepoSpec};

fn extension_spec(name: &str, version: &str) -> ExtensionSpec {
    ExtensionSpec {
        name: name.to_string(),
        version: version.to_string(),
        metadata: BTreeMap::new(),
    }
}

/// An extension served by the Helm chart `chart` from `repository`.
pub fn helm_extension(object: &str, chart: &str, repository: &str, version: &str) -> InstallAIExtension {
    InstallAIExtension::new(
        object,
        InstallAIExtensionSpec {
            helm: Some(HelmSpec {
                name: chart.to_string(),
                url: repository.to_string(),
                version: version.to_string(),
                values: BTreeMap::new(),
            }),
            repo: None,
            extension: extension_spec(chart, version),
        },
    )
}

/// An extension published in the git repository `url`.
pub fn repo_extension(object: &str, name: &str, url: &str, version: &str) -> InstallAIExtension {
    InstallAIExtension::new(
        object,
        InstallAIExtensionSpec {
            helm: None,
            repo: Some(RepoSpec {
                url: url.to_string(),
                branch: "main".to_string(),
            }),
            extension: extension_spec(name, version),
        },
    )
}
