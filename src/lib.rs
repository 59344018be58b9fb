//! Search and retrieve Kepler, K2 and TESS data products from MAST.
//!
//! A search resolves the target, queries the archive, and normalizes the
//! mission-specific catalog into one canonical, deduplicated
//! [`SearchResult`]. Results can be sliced, filtered and downloaded through a
//! [`Downloader`] backed by an explicit [`ProductCache`].
//!
//! The network collaborators sit behind traits ([`CoordinateResolver`],
//! [`ArchiveClient`], [`FootprintClient`], [`TransferClient`]) so the
//! normalization engine can be driven without MAST.

pub mod archive;
pub mod cache;
pub mod cadence;
pub mod campaign;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod fs_util;
pub mod http;
pub mod mission;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod result;
pub mod search;
pub mod tesscut;
pub mod transfer;

pub use archive::{ArchiveClient, ArchiveQuery};
pub use cache::{CacheKey, ProductCache};
pub use cadence::Cadence;
pub use catalog::{Observation, ProductKind, RawProduct};
pub use config::{ConfigLoader, ResolvedConfig};
pub use domain::{Mission, SkyCoord, Target, TargetId};
pub use download::{DownloadOptions, DownloadStatus, Downloader, Manifest, ManifestEntry};
pub use error::{LkError, SearchWarning};
pub use resolver::CoordinateResolver;
pub use result::{SearchResult, TableFilter};
pub use search::{K2Search, KeplerSearch, MastSearch, MissionSearch, SearchRequest, Searcher, TessSearch};
pub use tesscut::{FootprintClient, FootprintSector, TesscutState};
pub use transfer::{TransferClient, TransferOutcome, TransferStatus};
