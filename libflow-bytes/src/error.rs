use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    /// The first packet of the flow has no IPv4 layer, or the flow is empty
    #[error("no TTL available: {0}")]
    MissingTtl(&'static str),
    #[error("invalid hardware address {value:?} for interface {interface}")]
    InvalidAddress { interface: String, value: String },
}
