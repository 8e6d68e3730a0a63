pub mod budget;
pub mod cache;
pub mod claims;
pub mod config;
pub mod domain;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod sink;
pub mod wikidata;
