use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::info;

use classfeed_client::gateway::{ApiClient, DEFAULT_API_KEY, DEFAULT_BASE_URL};
use classfeed_client::{FeedStore, FileTokenStore, SessionStore, TokenStore};
use classfeed_types::api::Credentials;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classfeed=info".into()),
        )
        .init();

    // Config
    let base_url = env::var("CLASSFEED_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let api_key = env::var("CLASSFEED_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.into());
    let token_path =
        env::var("CLASSFEED_TOKEN_PATH").unwrap_or_else(|_| ".classfeed_token".into());

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(token_path));
    let api = ApiClient::new(base_url, api_key, tokens);
    let session = SessionStore::new(api.clone());
    let feed = FeedStore::new(api.clone(), session.clone());

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("help");

    match command {
        "signin" => {
            let email = arg(&args, 1, "email")?;
            let password = arg(&args, 2, "password")?;
            // Empty-input check belongs to the caller, not the session.
            if email.trim().is_empty() || password.is_empty() {
                bail!("email and password are required");
            }
            session.sign_in(&Credentials { email, password }).await;
            let state = session.current();
            if let Some(message) = state.last_error {
                bail!("sign-in failed: {message}");
            }
            match state.identity {
                Some(identity) => println!(
                    "signed in as {} ({})",
                    identity.display_name(),
                    identity.unique_id
                ),
                None => bail!("sign-in failed"),
            }
        }
        "signout" => {
            session.sign_out().await;
            println!("signed out");
        }
        "whoami" => {
            session.bootstrap().await;
            match session.current().identity {
                Some(identity) => {
                    println!("{} ({})", identity.display_name(), identity.unique_id);
                    if let Some(email) = identity.email() {
                        println!("email: {email}");
                    }
                }
                None => println!("not signed in"),
            }
        }
        "profile" => {
            session.bootstrap().await;
            let profile = api.get_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        "update-profile" => {
            session.bootstrap().await;
            let raw = arg(&args, 1, "json-patch")?;
            let patch: serde_json::Value = serde_json::from_str(&raw)?;
            let updated = api.update_profile(&patch).await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        "feed" => {
            session.bootstrap().await;
            let posts = feed.fetch_all().await?;
            if posts.is_empty() {
                println!("no posts");
            }
            for post in posts {
                println!("[{}] {}: {}", post.id, post.author.email, post.content);
                println!(
                    "    {} likes{}, {} comments, {}",
                    post.like_count,
                    if post.liked_by_me { " (liked)" } else { "" },
                    post.comment_count,
                    post.created_at_raw
                );
                for comment in post.comments.iter().take(2) {
                    println!("    > {}: {}", comment.author.display_name, comment.content);
                }
            }
        }
        "show" => {
            session.bootstrap().await;
            let post_id = arg(&args, 1, "post-id")?;
            let post = api.get_post(&post_id).await?;
            println!("{}", serde_json::to_string_pretty(&post)?);
        }
        "like" | "unlike" => {
            session.bootstrap().await;
            let post_id = arg(&args, 1, "post-id")?;
            feed.fetch_all().await?;
            feed.toggle_like(&post_id, command == "unlike").await?;
            println!("{command}d post {post_id}");
        }
        "comment" => {
            session.bootstrap().await;
            let post_id = arg(&args, 1, "post-id")?;
            let text = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
            feed.fetch_all().await?;
            let comment = feed.add_comment(&post_id, &text).await?;
            println!("comment {} added to post {post_id}", comment.id);
        }
        "post" => {
            session.bootstrap().await;
            let content = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            feed.create_post(&content).await?;
            println!("posted");
        }
        "delete" => {
            session.bootstrap().await;
            let post_id = arg(&args, 1, "post-id")?;
            if !confirm(&format!("delete post {post_id}?"))? {
                println!("cancelled");
                return Ok(());
            }
            feed.delete_post(&post_id).await?;
            println!("deleted post {post_id}");
        }
        "delete-comment" => {
            session.bootstrap().await;
            let comment_id = arg(&args, 1, "comment-id")?;
            if !confirm(&format!("delete comment {comment_id}?"))? {
                println!("cancelled");
                return Ok(());
            }
            feed.delete_comment(&comment_id).await?;
            println!("deleted comment {comment_id}");
        }
        "class" => {
            session.bootstrap().await;
            let year = arg(&args, 1, "enrollment-year")?;
            let members = api.class_by_year(&year).await?;
            info!(count = members.len(), year, "class roster fetched");
            if members.is_empty() {
                println!("no classmates found for {year}");
            }
            for member in members {
                let student_id = member.student_id.as_deref().unwrap_or("-");
                println!("{} <{}> {}", member.display_name, member.email, student_id);
            }
        }
        _ => usage(),
    }

    Ok(())
}

fn arg(args: &[String], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing <{name}> argument"))
}

/// Destructive actions are gated behind an explicit confirmation.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn usage() {
    eprintln!("usage: classfeed <command> [args]");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  signin <email> <password>   authenticate and store the token");
    eprintln!("  signout                     clear the session");
    eprintln!("  whoami                      show the reconciled identity");
    eprintln!("  profile                     dump the raw server profile");
    eprintln!("  update-profile <json>       patch the server profile");
    eprintln!("  feed                        list status posts");
    eprintln!("  show <post-id>              dump one raw post");
    eprintln!("  like <post-id>              like a post");
    eprintln!("  unlike <post-id>            remove a like");
    eprintln!("  comment <post-id> <text..>  comment on a post");
    eprintln!("  post <text..>               create a post");
    eprintln!("  delete <post-id>            delete a post (asks first)");
    eprintln!("  delete-comment <comment-id> delete a comment (asks first)");
    eprintln!("  class <enrollment-year>     list classmates by year");
}
