//! Query Demo
//!
//! Builds queries against the embedded backend:
//! - filter DSL and predicate groups
//! - ordering, offset and limit
//! - bulk updates with `incr` and `push`
//! - pagination with a page window

use modelite::{
    and, or, EmbeddedBackend, FieldSpec, FieldType, Filter, Models, ModelsConfig, Operator,
    PageWindow, Predicate, QueryOptions, Record,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Modelite Query Demo ===\n");

    let backend = EmbeddedBackend::in_memory();
    backend.create_model(
        "Book",
        vec![
            FieldSpec::new("title", FieldType::String).required(),
            FieldSpec::new("author", FieldType::String),
            FieldSpec::new("year", FieldType::Int),
            FieldSpec::new("stock", FieldType::Int),
            FieldSpec::new("tags", FieldType::List),
        ],
    )?;
    let models = Models::with_backend(Arc::new(backend), ModelsConfig::default().with_per_page(4));

    let books = [
        ("Dune", "Herbert", 1965),
        ("Neuromancer", "Gibson", 1984),
        ("Hyperion", "Simmons", 1989),
        ("Foundation", "Asimov", 1951),
        ("I, Robot", "Asimov", 1950),
        ("Snow Crash", "Stephenson", 1992),
        ("The Dispossessed", "Le Guin", 1974),
        ("Solaris", "Lem", 1961),
        ("Anathem", "Stephenson", 2008),
    ];
    for (title, author, year) in books {
        models.save(
            "Book",
            Record::new()
                .with("title", title)
                .with("author", author)
                .with("year", year)
                .with("stock", 3),
        )?;
    }

    println!("1. Filter DSL:");
    let classics = models
        .query("Book")?
        .filter_by([("year__lt", 1970)])?
        .order_by("year")?;
    println!("   {}", classics);
    for book in classics.all()? {
        println!("   - {:?} ({:?})", book.get("title"), book.get("year"));
    }

    println!("\n2. Predicate groups:");
    let picks = models.query("Book")?.filter(or(vec![
        Predicate::from(and(vec![
            Filter::eq("author", "Stephenson"),
            Filter::new("year", Operator::Gt, 2000),
        ])),
        Predicate::from(Filter::new("title", Operator::Contains, "Robot")),
    ]));
    println!("   {} matching books", picks.count()?);

    println!("\n3. Bulk update:");
    let updated = models
        .query("Book")?
        .filter_by([("author__in", vec!["Asimov", "Lem"])])?
        .update([("stock__incr", 2)])?;
    println!("   Restocked {} books", updated);
    models
        .query("Book")?
        .filter_by([("title", "Dune")])?
        .update([("tags__push", "desert")])?;

    println!("\n4. Pagination:");
    let ctx = models.context();
    let options = QueryOptions::new().order_by("title").paginate(2, None);
    let (page, pagination) = models.find_all("Book", &ctx, &options)?;
    if let Some(pagination) = pagination {
        println!(
            "   Page {} of {} ({} books)",
            pagination.page(),
            pagination.nb_pages(),
            pagination.total()
        );
        let window: Vec<String> = pagination
            .iter_pages(PageWindow::default())
            .map(|page| page.map_or("…".to_string(), |n| n.to_string()))
            .collect();
        println!("   Pages: {}", window.join(" "));
    }
    for book in page {
        println!("   - {:?}", book.get("title"));
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
