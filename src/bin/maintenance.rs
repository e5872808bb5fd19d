use std::env;

use anyhow::{bail, Context, Result};
use diesel::prelude::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use uuid::Uuid;

use cleaning_backend::{
    auth::password::hash_password,
    config::AppConfig,
    db,
    models::{NewUser, Role},
    schema::users,
};

const USAGE: &str = "Usage:\n  maintenance create-admin <email> <full_name>\n  maintenance hash-password <password>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["create-admin", email, full_name] => create_admin(email, full_name)?,
        ["hash-password", password] => println!("{}", hash_password(password)?),
        [cmd, ..] => {
            eprintln!("Unknown command or arguments: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        [] => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn create_admin(email: &str, full_name: &str) -> Result<()> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || full_name.trim().is_empty() {
        bail!("email and full name must not be empty");
    }

    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt().with_target(false).compact().init();
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let (password, generated) = match env::var("ADMIN_PASSWORD") {
        Ok(value) if !value.is_empty() => (value, false),
        _ => (random_password(), true),
    };

    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: hash_password(&password)?,
        full_name: full_name.trim().to_string(),
        phone: String::new(),
        role: Role::Admin.as_str().to_string(),
    };

    let inserted = diesel::insert_into(users::table)
        .values(&new_user)
        .on_conflict(users::email)
        .do_nothing()
        .execute(&mut conn)
        .context("failed to insert admin user")?;
    if inserted == 0 {
        bail!("a user with email {email} already exists");
    }

    println!("Admin {email} created.");
    if generated {
        println!("Generated password: {password}");
    }
    Ok(())
}

fn random_password() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}
