use clap::{Parser, Subcommand};
use reqwest::{Client, Response, StatusCode};
use std::error::Error;

#[derive(Parser)]
#[command(name = "item-service-cli")]
#[command(about = "Item Service CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "ITEM_SERVICE_ENDPOINT")]
    endpoint: String,

    /// Prefix the item routes are mounted under
    #[arg(short, long, default_value = "/sitecore/api/ssc")]
    route_base: String,

    /// Database to read from
    #[arg(short, long, global = true, default_value = "")]
    database: String,

    /// Item language
    #[arg(short, long, global = true, default_value = "")]
    language: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get an item by id
    Get {
        #[arg(value_name = "ITEM_ID")]
        id: String,

        /// Comma-separated list of properties to return
        #[arg(short, long)]
        fields: Option<String>,
    },

    /// List the children of an item
    Children {
        #[arg(value_name = "ITEM_ID")]
        id: String,
    },

    /// Search the index of a database
    Search {
        #[arg(value_name = "TERM")]
        term: String,

        #[arg(short, long, default_value = "0")]
        page: u32,

        #[arg(short = 's', long, default_value = "10")]
        page_size: u32,

        /// Facet filter, `field|value`
        #[arg(short, long)]
        facet: Option<String>,

        /// Sort fields, e.g. `a_name,d_created`
        #[arg(short = 'o', long)]
        sorting: Option<String>,
    },

    /// Delete an item and its descendants
    Delete {
        #[arg(value_name = "ITEM_ID")]
        id: String,
    },

    /// Check server health
    Health,
}

impl Cli {
    fn item_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.endpoint.trim_end_matches('/'),
            self.route_base.trim_end_matches('/'),
            path
        )
    }

    fn scope(&self) -> Vec<(&'static str, String)> {
        [("database", &self.database), ("language", &self.language)]
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }
}

async fn print_body(response: Response) -> Result<(), Box<dyn Error>> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        println!("{}", status);
        return Ok(());
    }

    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let scope = cli.scope();

    match cli.command {
        Commands::Get { ref id, ref fields } => {
            let mut query = scope;
            if let Some(fields) = fields {
                query.push(("fields", fields.clone()));
            }

            let response = client
                .get(cli.item_url(&format!("/item/{}", id)))
                .query(&query)
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Children { ref id } => {
            let response = client
                .get(cli.item_url(&format!("/item/{}/children", id)))
                .query(&scope)
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Search {
            ref term,
            page,
            page_size,
            ref facet,
            ref sorting,
        } => {
            let mut query = scope;
            query.push(("term", term.clone()));
            query.push(("page", page.to_string()));
            query.push(("pageSize", page_size.to_string()));
            if let Some(facet) = facet {
                query.push(("facet", facet.clone()));
            }
            if let Some(sorting) = sorting {
                query.push(("sorting", sorting.clone()));
            }

            let response = client
                .get(cli.item_url("/item/search"))
                .query(&query)
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Delete { ref id } => {
            let response = client
                .delete(cli.item_url(&format!("/item/{}", id)))
                .query(&scope)
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint.trim_end_matches('/')))
                .send()
                .await?;
            print_body(response).await?;
        }
    }

    Ok(())
}
