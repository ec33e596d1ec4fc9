use bookrev_types::config::BackendConfig;
use clap::Parser;

use crate::commands::{open_pool, Executor};

/// Recalculates average rating and review count of books from their reviews
#[derive(Parser, Debug)]
pub struct RecomputeRatingsCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "Only this book, all books if not given")]
    book_id: Option<i64>,
}

impl Executor for RecomputeRatingsCmd {
    async fn run(self) -> anyhow::Result<()> {
        let pool = open_pool(&self.backend).await?;
        match self.book_id {
            Some(id) => {
                let repository = bookrev_dal::review::ReviewRepository::new(pool);
                let summary = repository.recompute_rating(id).await?;
                println!(
                    "Book {id}: average rating {:.1} from {} reviews",
                    summary.average_rating, summary.total_reviews
                );
            }
            None => {
                let repository = bookrev_dal::book::BookRepository::new(pool);
                let processed = repository.recompute_all_ratings().await?;
                println!("Recomputed ratings of {processed} books");
            }
        }
        Ok(())
    }
}
