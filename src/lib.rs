pub mod config;
pub mod error;
pub mod fetcher;
pub mod fixtures;
pub mod fpl_api;
pub mod gameweek;
pub mod http_client;
pub mod ownership;
pub mod pipeline;
pub mod player_form;
pub mod snapshot;
pub mod stats;
pub mod team_form;
