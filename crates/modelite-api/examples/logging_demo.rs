use modelite::logging::{LogConfig, LogFormat};
use modelite::{BackendFactories, Models, ModelsConfig, Record};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Debug level shows every query as the backend executes it
    let _guard = LogConfig::debug().with_format(LogFormat::Compact).init()?;

    println!("=== Modelite Logging Demo ===\n");

    let config = ModelsConfig::new("embedded").with_option("auto_create_models", "true");
    let models = Models::from_config(config, &BackendFactories::new())?;
    models.connect()?;

    println!("\n1. Inserting records...");
    for name in ["Alice", "Bob", "Charlie"] {
        models.save("User", Record::new().with("name", name))?;
    }

    println!("\n2. Querying...");
    let found = models
        .query("User")?
        .filter_by([("name__contains", "li")])?
        .order_by("name DESC")?
        .all()?;
    println!("Found {} users", found.len());

    println!("\n3. Transaction rolled back...");
    let users = models.ensure_model("User", &[])?;
    let mut ctx = models.context();
    let uow = ctx.unit_of_work();
    uow.begin()?;
    uow.add(&users, Record::new().with("name", "Mallory"))?;
    uow.rollback()?;

    models.close()?;
    println!("\n=== Demo Complete ===");
    println!("Check the logs above to see tracing output!");

    Ok(())
}
