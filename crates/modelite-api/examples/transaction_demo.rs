//! Transaction Demo
//!
//! Shows a request context with its unit of work:
//! - committing and rolling back through `transaction`
//! - nested transactions
//! - calls delayed until the outermost commit
//! - scopes defined on the context

use modelite::{BackendFactories, Error, Models, ModelsConfig, Record};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Modelite Transaction Demo ===\n");

    let config = ModelsConfig::new("embedded").with_option("auto_create_models", "true");
    let models = Models::from_config(config, &BackendFactories::new())?;
    models.connect()?;
    let accounts = models.ensure_model("Account", &[])?;
    let mut ctx = models.context();

    println!("1. Commit:");
    ctx.unit_of_work().transaction(|tx| {
        tx.add(&accounts, Record::new().with("owner", "alice").with("balance", 100))?;
        tx.add(&accounts, Record::new().with("owner", "bob").with("balance", 20))?;
        Ok(())
    })?;
    println!("   ✓ {} accounts", models.query("Account")?.count()?);

    println!("\n2. Rollback on error:");
    let overdraft: modelite::Result<()> = ctx.unit_of_work().transaction(|tx| {
        tx.add(&accounts, Record::new().with("owner", "carol").with("balance", -5))?;
        Err(Error::Query("negative balance".to_string()))
    });
    println!("   ✓ Rejected: {}", overdraft.unwrap_err());
    println!("   ✓ Still {} accounts", models.query("Account")?.count()?);

    println!("\n3. Nested transactions with delayed calls:");
    let audit = Arc::new(std::sync::Mutex::new(Vec::new()));
    let query = models.query("Account")?;
    let sink = audit.clone();
    ctx.unit_of_work().transaction(|tx| {
        query
            .filter_by([("owner", "alice")])?
            .update([("balance__incr", -30)])?;
        tx.transaction(|inner| {
            query.filter_by([("owner", "bob")])?.update([("balance__incr", 30)])?;
            inner.delay_call(move || {
                if let Ok(mut entries) = sink.lock() {
                    entries.push("transfer alice -> bob: 30".to_string());
                }
                Ok(())
            })
        })
    })?;
    for entry in audit.lock().map(|entries| entries.clone()).unwrap_or_default() {
        println!("   ✓ audit: {}", entry);
    }

    println!("\n4. Scopes:");
    ctx.define_scope("Account", [("owner", "bob")]);
    let bob = models.scoped_query("Account", &ctx, &[] as &[&str])?.one()?;
    println!("   ✓ bob has {:?}", bob.get("balance"));

    models.close()?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
