//! Subcommand implementations.
//!
//! Each command drives the `Dashboard` stores the same way a screen would,
//! then prints the resulting snapshot.

use std::io::{self, Write};

use anyhow::{bail, Result};
use tracing::{info, warn};

use dashcache_core::models::{Product, User};
use dashcache_core::utils::{format_optional, format_price, format_rating, truncate_string};
use dashcache_core::{Config, Dashboard, StoreSnapshot};

use crate::cli::{LoginArgs, ProductsArgs, UsersArgs};

/// Column width for names and titles in listings
const NAME_WIDTH: usize = 28;

/// Column width for email addresses and categories
const DETAIL_WIDTH: usize = 32;

// ===== Session =====

pub async fn login(dashboard: &Dashboard, config: &mut Config, args: LoginArgs) -> Result<()> {
    let username = match args.username {
        Some(username) => username,
        None => prompt_username(config.last_username.as_deref())?,
    };
    let password = match args.password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    dashboard.session.login(&username, &password).await?;

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    if let Some(user) = dashboard.session.user() {
        println!("Logged in as {} ({})", user.greeting_name(), user.username);
    }
    Ok(())
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim();
    Ok(match (username.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => username.to_string(),
    })
}

pub fn logout(dashboard: &Dashboard) {
    dashboard.session.logout();
    println!("Logged out");
}

pub fn whoami(dashboard: &Dashboard) {
    match dashboard.session.user() {
        Some(user) => {
            println!("{} (id {})", user.username, user.id);
            let name = format!(
                "{} {}",
                user.first_name.as_deref().unwrap_or(""),
                user.last_name.as_deref().unwrap_or("")
            );
            if !name.trim().is_empty() {
                println!("  Name:  {}", name.trim());
            }
            println!("  Email: {}", format_optional(&user.email, "-"));
        }
        None => println!("Not logged in"),
    }
}

// ===== Dashboard =====

pub async fn stats(dashboard: &Dashboard) -> Result<()> {
    let stats = dashboard.stats().await?;
    println!("Users:    {}", stats.total_users);
    println!("Products: {}", stats.total_products);
    Ok(())
}

// ===== Users =====

pub async fn users(dashboard: &Dashboard, args: UsersArgs) -> Result<()> {
    let store = &dashboard.users;
    if let Some(search) = args.search {
        let _ = store.set_search_text(search);
    }
    let _ = store.set_page(args.page - 1);
    store.load_list().await;

    let snap = checked(store.snapshot())?;
    for user in &snap.items {
        println!(
            "{:>5}  {:<name$}  {:<detail$}",
            user.id,
            truncate_string(&user.full_name(), NAME_WIDTH),
            truncate_string(&format_optional(&user.email, "-"), DETAIL_WIDTH),
            name = NAME_WIDTH,
            detail = DETAIL_WIDTH,
        );
    }
    print_footer(&snap);
    Ok(())
}

pub async fn user(dashboard: &Dashboard, id: u64) -> Result<()> {
    dashboard.users.load_detail(id).await;
    let snap = checked(dashboard.users.snapshot())?;
    match snap.selected {
        Some(user) => print_user(&user),
        None => bail!("User {} not found", id),
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("{} (id {})", user.full_name(), user.id);
    println!("  Username: {}", format_optional(&user.username, "-"));
    println!("  Email:    {}", format_optional(&user.email, "-"));
    println!("  Phone:    {}", format_optional(&user.phone, "-"));
    if let Some(age) = user.age {
        println!("  Age:      {}", age);
    }
    if let Some(address) = user.address.as_ref().and_then(|a| a.formatted()) {
        println!("  Address:  {}", address);
    }
    if let Some(job) = user.job_display() {
        println!("  Job:      {}", job);
    }
}

// ===== Products =====

pub async fn products(dashboard: &Dashboard, args: ProductsArgs) -> Result<()> {
    let store = &dashboard.products;
    if let Some(search) = args.search {
        let _ = store.set_search_text(search);
    } else if let Some(category) = args.category {
        let _ = store.set_category_filter(category);
    }
    let _ = store.set_page(args.page - 1);
    store.load_list().await;

    let snap = checked(store.snapshot())?;
    for product in &snap.items {
        println!(
            "{:>5}  {:<name$}  {:>10}  {:<detail$}",
            product.id,
            truncate_string(&product.title, NAME_WIDTH),
            format_price(product.discounted_price()),
            truncate_string(&format_optional(&product.category, "-"), DETAIL_WIDTH),
            name = NAME_WIDTH,
            detail = DETAIL_WIDTH,
        );
    }
    print_footer(&snap);
    Ok(())
}

pub async fn product(dashboard: &Dashboard, id: u64) -> Result<()> {
    dashboard.products.load_detail(id).await;
    let snap = checked(dashboard.products.snapshot())?;
    match snap.selected {
        Some(product) => print_product(&product),
        None => bail!("Product {} not found", id),
    }
    Ok(())
}

fn print_product(product: &Product) {
    println!("{} (id {})", product.title, product.id);
    println!("  Brand:    {}", format_optional(&product.brand, "-"));
    println!("  Category: {}", format_optional(&product.category, "-"));
    if product.discount_percentage > 0.0 {
        println!(
            "  Price:    {} (was {}, -{:.0}%)",
            format_price(product.discounted_price()),
            format_price(product.price),
            product.discount_percentage
        );
    } else {
        println!("  Price:    {}", format_price(product.price));
    }
    println!("  Rating:   {}", format_rating(product.rating));
    let stock = match product.stock {
        Some(n) if product.in_stock() => format!("{} in stock", n),
        _ => "Out of stock".to_string(),
    };
    println!("  Stock:    {}", stock);
    if let Some(description) = &product.description {
        println!();
        println!("{}", description);
    }
}

pub async fn categories(dashboard: &Dashboard) -> Result<()> {
    dashboard.products.load_categories().await;
    let snap = dashboard.products.snapshot();
    if snap.categories.is_empty() {
        bail!("Category catalog unavailable");
    }
    for category in &snap.categories {
        println!("{:<24}  {}", category.slug, category.display_name());
    }
    Ok(())
}

// ===== Helpers =====

fn checked<E>(snap: StoreSnapshot<E>) -> Result<StoreSnapshot<E>> {
    if let Some(error) = &snap.error {
        bail!(error.clone());
    }
    Ok(snap)
}

fn print_footer<E>(snap: &StoreSnapshot<E>) {
    let pages = snap.page_count();
    if snap.items.is_empty() {
        println!("No results");
    }
    info!(page = snap.page, total = snap.total, "Listing printed");
    println!();
    println!(
        "Page {} of {} ({} total){}",
        snap.page + 1,
        pages.max(1),
        snap.total,
        if snap.has_next_page() { ", more with --page" } else { "" }
    );
}
