//! Subcommands and their output

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use questlog_catalog::{
    CatalogContext, GameFields, GameRecord, ListFilter, cover_dimensions, default_export_file_name,
};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a game
    Add {
        #[command(flatten)]
        entry: EntryArgs,

        /// Cover image file (PNG, JPEG, WebP, ...)
        #[arg(long)]
        cover: PathBuf,
    },

    /// Edit a game; omitted fields keep their current value
    Update {
        id: i64,

        #[command(flatten)]
        changes: ChangeArgs,

        /// Replacement cover image file
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Remove a game
    Delete { id: i64 },

    /// List games, finished ones first
    List {
        /// Completion year
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        platform: Option<String>,

        /// Include games without a completion date
        #[arg(long)]
        show_unfinished: bool,
    },

    /// Show one game in full
    Show { id: i64 },

    /// Years and platforms available for filtering
    Filters,

    /// Write a JSON backup
    Export {
        /// Output file (defaults to a dated name in the current directory)
        file: Option<PathBuf>,
    },

    /// Replace the catalog with a JSON backup
    Import { file: PathBuf },
}

/// Fields for a new game
#[derive(Args, Debug)]
pub struct EntryArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    platform: String,

    /// YYYY-MM-DD
    #[arg(long)]
    release_date: String,

    /// YYYY-MM-DD; omit for an unfinished game
    #[arg(long, default_value = "")]
    play_date: String,

    /// 0 to 10
    #[arg(long, allow_hyphen_values = true)]
    rating: i64,

    #[arg(long, default_value = "")]
    review: String,
}

impl From<EntryArgs> for GameFields {
    fn from(args: EntryArgs) -> Self {
        Self {
            title: args.title,
            platform: args.platform,
            release_date: args.release_date,
            play_date: args.play_date,
            rating: args.rating,
            review: args.review,
        }
    }
}

/// Field overrides for an existing game
#[derive(Args, Debug, Default)]
pub struct ChangeArgs {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    platform: Option<String>,

    #[arg(long)]
    release_date: Option<String>,

    /// Empty string marks the game unfinished again
    #[arg(long)]
    play_date: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    rating: Option<i64>,

    #[arg(long)]
    review: Option<String>,
}

impl ChangeArgs {
    fn apply(self, mut fields: GameFields) -> GameFields {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(platform) = self.platform {
            fields.platform = platform;
        }
        if let Some(release_date) = self.release_date {
            fields.release_date = release_date;
        }
        if let Some(play_date) = self.play_date {
            fields.play_date = play_date;
        }
        if let Some(rating) = self.rating {
            fields.rating = rating;
        }
        if let Some(review) = self.review {
            fields.review = review;
        }
        fields
    }
}

/// Execute one subcommand against the session catalog
pub async fn run(context: &CatalogContext, command: Command) -> Result<()> {
    let catalog = context.catalog().await?;

    match command {
        Command::Add { entry, cover } => {
            let bytes = read_cover(&cover).await?;
            let record = catalog.add_record(entry.into(), Some(bytes)).await?;
            println!("Added #{} {}", record.id, record.title);
        }
        Command::Update { id, changes, cover } => {
            let current = catalog.get_record(id).await?;
            let fields = changes.apply(GameFields::from_record(&current));
            let bytes = match cover {
                Some(path) => Some(read_cover(&path).await?),
                None => None,
            };
            let record = catalog.update_record(id, fields, bytes).await?;
            println!("Updated #{} {}", record.id, record.title);
        }
        Command::Delete { id } => {
            if catalog.delete_record(id).await? {
                println!("Deleted #{}", id);
            } else {
                println!("No game #{}", id);
            }
        }
        Command::List {
            year,
            platform,
            show_unfinished,
        } => {
            let filter = ListFilter {
                year,
                platform,
                show_unfinished,
            };
            let records = catalog.list_records(&filter).await?;
            if records.is_empty() {
                println!("No games");
            }
            for record in &records {
                println!("{}", summary_line(record));
            }
        }
        Command::Show { id } => {
            let record = catalog.get_record(id).await?;
            println!("{}", details(&record));
        }
        Command::Filters => {
            let options = catalog.filter_options().await?;
            let years: Vec<String> = options.years.iter().map(i32::to_string).collect();
            println!("Years: {}", years.join(", "));
            println!("Platforms: {}", options.platforms.join(", "));
        }
        Command::Export { file } => {
            let path = file.unwrap_or_else(|| {
                PathBuf::from(default_export_file_name(chrono::Local::now().date_naive()))
            });
            let count = catalog.export_to_file(&path).await?;
            println!("Exported {} games to {}", count, path.display());
        }
        Command::Import { file } => {
            let count = catalog.import_from_file(&file).await?;
            println!("Imported {} games from {}", count, file.display());
        }
    }

    Ok(())
}

async fn read_cover(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading cover image {}", path.display()))
}

fn completion(record: &GameRecord) -> String {
    record
        .play_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "unfinished".to_string())
}

/// One-line listing entry
fn summary_line(record: &GameRecord) -> String {
    format!(
        "#{}  {}  [{}]  {}  {}/10",
        record.id,
        record.title,
        record.platform,
        completion(record),
        record.rating
    )
}

/// Multi-line description of a game
fn details(record: &GameRecord) -> String {
    let cover = match cover_dimensions(&record.cover) {
        Ok((width, height)) => format!("{}x{} PNG", width, height),
        Err(e) => format!("unreadable ({})", e),
    };

    let mut lines = vec![
        format!("#{} {}", record.id, record.title),
        format!("Platform:  {}", record.platform),
        format!("Released:  {}", record.release_date),
        format!("Finished:  {}", completion(record)),
        format!("Rating:    {}/10", record.rating),
        format!("Cover:     {}", cover),
    ];
    if !record.review.is_empty() {
        lines.push(String::new());
        lines.push(record.review.clone());
    }
    lines.join("\n")
}
