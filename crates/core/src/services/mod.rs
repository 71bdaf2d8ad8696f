mod catalogue_service;

pub use catalogue_service::{CatalogueService, PodcastDetail, PodcastSummary};
