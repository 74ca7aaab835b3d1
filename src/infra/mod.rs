pub mod http_client;
pub mod reachability;

pub use http_client::ReqwestCatalogApi;
pub use reachability::ReachabilityProbe;
