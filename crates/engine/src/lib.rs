pub mod concurrency;
pub mod directory;
pub mod dispatch;
pub mod handlers;
pub mod ledger;
pub mod news;
pub mod router;
pub mod sweeper;
pub mod templates;

#[cfg(test)]
mod testing;
