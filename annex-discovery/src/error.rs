use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Error parsing resource descriptor '{0}': expected <resource>/<group> or <resource>/<version>/<group>")]
    Malformed(String),

    #[error("No such resource in the cluster API: '{0}'")]
    Unknown(String),

    #[error("API discovery failed: {0}")]
    Discovery(String),
}

impl From<kube::Error> for ResolutionError {
    fn from(err: kube::Error) -> Self {
        ResolutionError::Discovery(err.to_string())
    }
}
