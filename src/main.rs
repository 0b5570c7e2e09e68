use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;
use sourdough::{
    AppConfig, Database, OpenAIProvider, ProviderIdentity, RecipeForm, RecipePipeline,
    RecipeRequest,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sourdough")]
#[command(about = "Import and manage your recipes", long_about = None)]
struct Cli {
    /// Subject id issued by your identity provider
    #[arg(long, global = true, env = "SOURDOUGH_USER", default_value = "local")]
    user: String,

    /// Identity provider name
    #[arg(long, global = true, env = "SOURDOUGH_PROVIDER", default_value = "local")]
    provider: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a recipe from text or a photo and store it
    Import {
        /// Recipe text
        #[arg(long, conflicts_with_all = ["text_file", "image"])]
        text: Option<String>,
        /// File containing the recipe text
        #[arg(long, conflicts_with = "image")]
        text_file: Option<PathBuf>,
        /// Photo of the recipe
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// List your recipes, newest first
    List,
    /// Find your recipes by title
    Search { term: String },
    /// Show one recipe
    Show { id: String },
    /// Edit a recipe; fields not given keep their current value
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Ingredients, one per line
        #[arg(long)]
        ingredients: Option<String>,
        /// Directions, one per line
        #[arg(long)]
        directions: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        prep_time: Option<String>,
        #[arg(long)]
        cook_time: Option<String>,
        #[arg(long)]
        servings: Option<i64>,
    },
    /// Delete a recipe
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    debug!("Using database at {}", config.database.path);

    let db = Database::connect(&config.database.path, config.database.max_connections).await?;
    let provider = OpenAIProvider::new(&config.llm)?;
    let pipeline = RecipePipeline::new(&db, Arc::new(provider));

    let identity = ProviderIdentity::new(cli.user, cli.provider);
    pipeline.sign_in(&identity).await?;
    let caller = Some(&identity);

    match cli.command {
        Commands::Import {
            text,
            text_file,
            image,
        } => {
            let request = match (text, text_file, image) {
                (_, _, Some(path)) => {
                    let data = tokio::fs::read(&path).await?;
                    RecipeRequest::image(data, guess_mime_type(&path))
                }
                (_, Some(path), None) => RecipeRequest::text(tokio::fs::read_to_string(path).await?),
                (text, None, None) => RecipeRequest {
                    text,
                    image: None,
                },
            };

            let id = pipeline.create_recipe(caller, request).await?;
            let recipe = pipeline.get_recipe(caller, id).await?;
            print_json(&recipe)?;
        }
        Commands::List => {
            print_json(&pipeline.list_recipes(caller).await?)?;
        }
        Commands::Search { term } => {
            print_json(&pipeline.search_recipes(caller, &term).await?)?;
        }
        Commands::Show { id } => {
            let id = sourdough::parse_recipe_id(&id)?;
            print_json(&pipeline.get_recipe(caller, id).await?)?;
        }
        Commands::Edit {
            id,
            title,
            ingredients,
            directions,
            notes,
            prep_time,
            cook_time,
            servings,
        } => {
            let id = sourdough::parse_recipe_id(&id)?;
            let current = pipeline.get_recipe(caller, id).await?;

            let mut form = RecipeForm::from_recipe(&current);
            if let Some(title) = title {
                form.title = title;
            }
            if let Some(ingredients) = ingredients {
                form.ingredients = ingredients;
            }
            if let Some(directions) = directions {
                form.directions = directions;
            }
            if let Some(notes) = notes {
                form.notes = notes;
            }
            if let Some(prep_time) = prep_time {
                form.prep_time = prep_time;
            }
            if let Some(cook_time) = cook_time {
                form.cook_time = cook_time;
            }
            if let Some(servings) = servings {
                form.servings = servings;
            }

            pipeline.update_recipe(caller, id, form).await?;
            print_json(&pipeline.get_recipe(caller, id).await?)?;
        }
        Commands::Delete { id } => {
            let id = sourdough::parse_recipe_id(&id)?;
            let deleted = pipeline.delete_recipe(caller, id).await?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))?;
        }
    }

    db.close().await;
    Ok(())
}

fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
