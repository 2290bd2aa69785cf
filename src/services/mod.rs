// Service exports
pub mod audit;
pub mod cache;
pub mod delivery;
pub mod feeds;
pub mod geocoding;
pub mod routing;

pub use audit::{AuditError, AuditSink, CsvAuditSink};
pub use cache::{CachedGeoResolver, CacheStats};
pub use delivery::{deliver_all, AuditEntry, DeliveryError, DeliveryReport, DeliverySink, SendGridSink, SendGridTemplate};
pub use feeds::{load_participants, load_roster, read_participants, read_roster, ParticipantFeed};
pub use geocoding::{GeoResolver, GeocodeError, MapQuestGeocoder};
pub use routing::{OsrmRouter, RouteDistanceProvider, RouteProviderError};
