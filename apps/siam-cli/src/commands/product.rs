//! # Product Commands
//!
//! Lookup, listing, registration and deletion.

use serde_json::Value;
use siam_core::{Product, RemoteWrite};
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::{AppContext, CreateArgs};

/// One-line rendering used by every listing.
pub fn product_line(product: &Product) -> String {
    format!(
        "{:<16} {:<32} {:>6} {:<8} {}",
        product.code, product.name, product.quantity, product.unit, product.category
    )
}

/// Suffix describing where a write ended up.
pub fn remote_suffix(write: RemoteWrite) -> &'static str {
    match write {
        RemoteWrite::Synced => "",
        RemoteWrite::Queued => " (pending sync)",
        RemoteWrite::LocalOnly => " (saved on this device only)",
    }
}

pub async fn lookup(ctx: &AppContext, code: &str) -> CliResult<()> {
    ctx.connect().await;

    let product = ctx
        .repo
        .find_by_code(code)
        .await
        .ok_or_else(|| CliError::not_found(code.trim()))?;

    ctx.output.emit(&product, || {
        let mut text = format!(
            "{}\n  name:     {}\n  category: {}\n  stock:    {} {}\n  location: {}",
            product.code, product.name, product.category, product.quantity, product.unit, product.location
        );
        if let Some(price) = product.unit_price {
            text.push_str(&format!("\n  price:    {:.2}", price));
        }
        for (key, value) in &product.extra_fields {
            text.push_str(&format!("\n  {}: {}", key, value));
        }
        text
    })
}

pub async fn list(ctx: &AppContext, category: Option<&str>, search: Option<&str>) -> CliResult<()> {
    let products = match (category, search) {
        (Some(category), _) => ctx.repo.list_by_category(category).await,
        (None, Some(term)) => ctx.repo.search(term).await,
        (None, None) => ctx.repo.list_all().await,
    };
    debug!(count = products.len(), "Products listed");

    ctx.output.emit(&products, || {
        if products.is_empty() {
            return "No products".to_string();
        }
        products.iter().map(product_line).collect::<Vec<_>>().join("\n")
    })
}

/// Parses `key=value`; the value is JSON when it parses, a string otherwise.
pub fn parse_field(raw: &str) -> CliResult<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::input(format!("Expected KEY=VALUE, got '{}'", raw)))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::input(format!("Empty field name in '{}'", raw)));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

impl TryFrom<CreateArgs> for Product {
    type Error = CliError;

    fn try_from(args: CreateArgs) -> CliResult<Product> {
        let mut product = Product::new(args.code, args.name);
        product.category = args.category;
        product.quantity = args.quantity;
        product.unit = args.unit;
        product.location = args.location;
        product.unit_price = args.price;
        product.image_url = args.image_url;

        for raw in &args.fields {
            let (key, value) = parse_field(raw)?;
            product.extra_fields.insert(key, value);
        }

        Ok(product)
    }
}

pub async fn create(ctx: &AppContext, args: CreateArgs) -> CliResult<()> {
    let product = Product::try_from(args)?;
    ctx.connect().await;

    let code = product.code.trim().to_string();
    let write = ctx.repo.create_product(product).await?;

    ctx.output.emit(&serde_json::json!({ "code": code, "remote": write }), || {
        format!("✓ Product {} registered{}", code, remote_suffix(write))
    })
}

pub async fn delete(ctx: &AppContext, code: &str) -> CliResult<()> {
    ctx.connect().await;

    let write = ctx.repo.delete_product(code).await?;

    ctx.output.emit(&serde_json::json!({ "code": code.trim(), "remote": write }), || {
        format!("✓ Product {} deleted{}", code.trim(), remote_suffix(write))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::offline_context;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn args(code: &str, name: &str, fields: &[&str]) -> CreateArgs {
        CreateArgs {
            code: code.into(),
            name: name.into(),
            category: "Office".into(),
            quantity: 4,
            unit: "boxes".into(),
            location: "A-3".into(),
            price: Some(12.5),
            image_url: None,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("max_stock=40").unwrap(), ("max_stock".into(), json!(40)));
        assert_eq!(
            parse_field("expiration_date=2026-01-31").unwrap(),
            ("expiration_date".into(), json!("2026-01-31"))
        );
        assert_eq!(parse_field("note=a=b").unwrap().1, json!("a=b"));
        assert!(parse_field("nokey").is_err());
        assert!(parse_field("=3").is_err());
    }

    #[test]
    fn test_create_args_to_product() {
        let product = Product::try_from(args("A1", "Binder", &["max_stock=40"])).unwrap();
        assert_eq!(product.unit, "boxes");
        assert_eq!(product.unit_price, Some(12.5));
        assert_eq!(product.extra_fields["max_stock"], json!(40));
    }

    #[tokio::test]
    async fn test_create_then_lookup_offline() {
        let ctx = offline_context().await;

        create(&ctx, args(" A1 ", "Binder", &[])).await.unwrap();
        lookup(&ctx, "A1").await.unwrap();

        assert_eq!(ctx.repo.pending_operations().await.len(), 1);
        let err = lookup(&ctx, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_product() {
        let ctx = offline_context().await;

        let err = create(&ctx, args("", "Binder", &[])).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Code is required");
        assert!(ctx.repo.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_product() {
        let ctx = offline_context().await;
        let err = delete(&ctx, "A1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
