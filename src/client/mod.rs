/// Clients for the outside world: the pulse feed and the Bark push gateway

pub mod feed;
pub mod bark;

pub use feed::{DirectFeedClient, FallbackFeed, FeedResponse, FeedSource, FileFeed, PulseQueryClient};
pub use bark::BarkNotifier;
