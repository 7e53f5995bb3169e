use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use shelf_app::app::{shutdown_signal, App};
use shelf_app::client::view::{render_book, render_errors, render_list};
use shelf_app::client::{BookApi, FormController, FormError, HttpBookApi, Submitted};
use shelf_app::modules::books::models::{Book, Field};
use shelf_kernel::settings::Settings;

/// Top-level CLI parser for the `shelf-cli` binary.
#[derive(Debug, Parser)]
#[command(name = "shelf-cli", version, about = "SHELF book catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Book API base URL (defaults to `client.base_url` from settings)
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the catalog server
    Serve,
    /// List books, optionally filtered by name
    List {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Add a book
    Add(BookArgs),
    /// Overwrite fields of an existing book
    Edit {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        fields: BookArgs,
    },
    /// Delete a book
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Debug, Default, Args)]
struct BookArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    published_date: Option<String>,
}

impl BookArgs {
    fn given(&self) -> impl Iterator<Item = (Field, &str)> {
        [
            (Field::Name, &self.name),
            (Field::Price, &self.price),
            (Field::Description, &self.description),
            (Field::PublishedDate, &self.published_date),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|value| (field, value)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    let base_url = cli
        .base_url
        .unwrap_or_else(|| settings.client.base_url.clone());
    let page_size = settings.client.page_size;
    let form = || FormController::new(HttpBookApi::new(base_url.clone()), page_size);

    match cli.command {
        Command::Serve => {
            tracing::info!(env = ?settings.environment, "serving catalog");
            let app = App::bootstrap(settings).await?;
            app.run(shutdown_signal()).await?;
        }
        Command::List { search } => {
            let form = form();
            form.search(&search).await?;
            println!("{}", render_list(&form.snapshot()));
        }
        Command::Add(fields) => {
            let form = form();
            apply(&form, &fields);
            report(submit(&form).await?);
        }
        Command::Edit { id, fields } => {
            let form = form();
            let book = locate(&form, &id)
                .await?
                .with_context(|| format!("no book with id '{id}'"))?;
            form.start_edit(&book);
            apply(&form, &fields);
            report(submit(&form).await?);
        }
        Command::Delete { id } => {
            form().remove(&id).await?;
            println!("deleted {id}");
        }
    }

    Ok(())
}

fn apply<A: BookApi>(form: &FormController<A>, fields: &BookArgs) {
    for (field, value) in fields.given() {
        form.handle_change(field, value);
    }
}

async fn submit<A: BookApi>(form: &FormController<A>) -> anyhow::Result<Submitted> {
    match form.submit().await {
        Ok(submitted) => Ok(submitted),
        Err(FormError::Invalid(errors)) => {
            eprintln!("{}", render_errors(&errors));
            bail!("{} not saved: form is incomplete", form.submit_label());
        }
        Err(err) => Err(err.into()),
    }
}

fn report(submitted: Submitted) {
    let verb = match submitted {
        Submitted::Created(_) => "added",
        Submitted::Updated(_) => "updated",
    };
    println!("{verb}:\n{}", render_book(submitted.book()));
}

/// Page through the catalog until the book with `id` turns up.
async fn locate<A: BookApi>(form: &FormController<A>, id: &str) -> anyhow::Result<Option<Book>> {
    form.on_mount().await?;
    if let Some(book) = form.book(id) {
        return Ok(Some(book));
    }

    let limit = 100;
    let mut page = 1;
    loop {
        let listing = form.api().list("", page, limit).await?;
        if let Some(book) = listing.books.iter().find(|book| book.id == id) {
            return Ok(Some(book.clone()));
        }
        if listing.books.is_empty() || page.saturating_mul(listing.limit) >= listing.total {
            return Ok(None);
        }
        page += 1;
    }
}
