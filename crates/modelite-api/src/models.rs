//! The models facade: model registry, scopes and query helpers over the
//! configured backend.

use crate::config::ModelsConfig;
use crate::context::RequestContext;
use crate::factory::BackendFactories;
use crate::transaction::TransactionGate;
use crate::{
    Backend, Error, FieldSpec, Filter, ModelRef, ModelRegistry, Pagination, Query, Record, Result,
    Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Page of a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    /// Falls back to `pagination_per_page` of the configuration
    pub per_page: Option<usize>,
}

/// Declarative description of a query, as received from a caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Named scopes from the configuration
    pub scopes: Vec<String>,
    /// `(field__op, value)` pairs of the filter DSL
    pub filters: Vec<(String, Value)>,
    /// Order specification (`"name"`, `"age DESC, name"`)
    pub order_by: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Only used by [`Models::find_all`]
    pub paginate: Option<PageRequest>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.push(name.into());
        self
    }

    pub fn filter(mut self, token: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((token.into(), value.into()));
        self
    }

    pub fn order_by(mut self, spec: impl Into<String>) -> Self {
        self.order_by = Some(spec.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: Option<usize>) -> Self {
        self.paginate = Some(PageRequest { page, per_page });
        self
    }
}

/// Entry point of the models layer.
///
/// Owns the backend selected by the configuration and the registry of
/// models resolved through it. Everything request-specific lives in a
/// [`RequestContext`] passed to the query helpers.
#[derive(Debug)]
pub struct Models {
    backend: Arc<dyn Backend>,
    registry: ModelRegistry,
    config: ModelsConfig,
    gate: Arc<TransactionGate>,
    connected: AtomicBool,
}

impl Models {
    /// Build the configured backend through `factories`.
    ///
    /// Fails with [`Error::Config`] when the backend reference cannot be
    /// resolved to exactly one registered backend.
    pub fn from_config(config: ModelsConfig, factories: &BackendFactories) -> Result<Self> {
        let backend = factories.build(&config)?;
        info!(backend = backend.name(), "models backend ready");
        Ok(Self::with_backend(backend, config))
    }

    /// Use an already built backend
    pub fn with_backend(backend: Arc<dyn Backend>, config: ModelsConfig) -> Self {
        Self {
            backend,
            registry: ModelRegistry::new(),
            config,
            gate: Arc::new(TransactionGate::new()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn config(&self) -> &ModelsConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Fresh context for one logical request.
    ///
    /// Contexts of the same `Models` share one [`TransactionGate`], so their
    /// transactions run one after the other.
    pub fn context(&self) -> RequestContext {
        RequestContext::with_gate(self.backend.clone(), self.gate.clone())
    }

    /// Fail unless the active backend is named `name`
    pub fn require_backend(&self, name: &str) -> Result<()> {
        if self.backend.name() != name {
            return Err(Error::Config(format!(
                "A models backend named '{}' is required but '{}' is used",
                name,
                self.backend.name()
            )));
        }
        Ok(())
    }

    /// Resolve `name` and validate the declared `fields` against its schema
    pub fn ensure_model(&self, name: &str, fields: &[FieldSpec]) -> Result<ModelRef> {
        self.registry.ensure(self.backend.as_ref(), name, fields)
    }

    pub fn insert_model(&self, name: &str, model: ModelRef) -> Result<()> {
        self.registry.insert(name, model)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Unfiltered query on `model`
    pub fn query(&self, model: &str) -> Result<Query> {
        Ok(Query::new(self.ensure_model(model, &[])?, self.backend.clone()))
    }

    /// Query restricted by the scopes `ctx` defines for `model`, then by the
    /// named configuration scopes in order.
    ///
    /// An unknown scope name fails with [`Error::Query`].
    pub fn scoped_query<S: AsRef<str>>(
        &self,
        model: &str,
        ctx: &RequestContext,
        scopes: &[S],
    ) -> Result<Query> {
        let mut query = self
            .query(model)?
            .filter_by(ctx.scope(model).map(|(token, value)| (token, value.clone())))?;
        for name in scopes {
            let name = name.as_ref();
            let filters = self
                .config
                .scopes
                .get(name)
                .ok_or_else(|| Error::Query(format!("Missing model scope '{}'", name)))?;
            let mut pairs = Vec::with_capacity(filters.len());
            for filter in filters {
                pairs.push((filter.field.as_str(), filter.resolve(ctx.vars())?));
            }
            query = query.filter_by(pairs)?;
        }
        Ok(query)
    }

    /// Scoped query refined by `options` (pagination excluded)
    pub fn build_query(&self, model: &str, ctx: &RequestContext, options: &QueryOptions) -> Result<Query> {
        let mut query = self
            .scoped_query(model, ctx, options.scopes.as_slice())?
            .filter_by(options.filters.iter().map(|(token, value)| (token.as_str(), value.clone())))?;
        if let Some(spec) = &options.order_by {
            query = query.order_by(spec.as_str())?;
        }
        if options.limit.is_some() {
            query = query.limit(options.limit);
        }
        if options.offset.is_some() {
            query = query.offset(options.offset);
        }
        debug!(model, query = %query, "built query");
        Ok(query)
    }

    /// Window `query` on `page`.
    ///
    /// The total is counted with ordering, offset and limit cleared. With
    /// `check_bounds`, a page outside `[1, nb_pages]` fails with
    /// [`Error::PageOutOfBound`] unless there is nothing to paginate.
    pub fn paginate(
        &self,
        query: &Query,
        page: usize,
        per_page: Option<usize>,
        check_bounds: bool,
    ) -> Result<(Query, Pagination)> {
        let per_page = per_page.unwrap_or(self.config.pagination_per_page);
        if per_page == 0 {
            return Err(Error::Query("per_page must be greater than zero".to_string()));
        }
        let total = query.clear_order().offset(None).limit(None).count()?;
        let pagination = Pagination::new(page, per_page, total);
        if check_bounds {
            pagination.check_bounds()?;
        }
        let windowed = query.offset(pagination.offset()).limit(per_page);
        Ok((windowed, pagination))
    }

    /// First record matching `options`; [`Error::NotFound`] when `required`
    /// and nothing matches
    pub fn find_first(
        &self,
        model: &str,
        ctx: &RequestContext,
        options: &QueryOptions,
        required: bool,
    ) -> Result<Option<Record>> {
        match self.build_query(model, ctx, options)?.first()? {
            None if required => Err(Error::NotFound),
            found => Ok(found),
        }
    }

    /// Records matching `options`, paginated when `options.paginate` is set.
    ///
    /// A requested page outside the available ones fails with
    /// [`Error::NotFound`].
    pub fn find_all(
        &self,
        model: &str,
        ctx: &RequestContext,
        options: &QueryOptions,
    ) -> Result<(Vec<Record>, Option<Pagination>)> {
        let query = self.build_query(model, ctx, options)?;
        match options.paginate {
            None => Ok((query.all()?, None)),
            Some(request) => {
                let (query, pagination) = self
                    .paginate(&query, request.page, request.per_page, true)
                    .map_err(|err| match err {
                        Error::PageOutOfBound { .. } => Error::NotFound,
                        other => other,
                    })?;
                Ok((query.all()?, Some(pagination)))
            }
        }
    }

    pub fn count(&self, model: &str, ctx: &RequestContext, options: &QueryOptions) -> Result<usize> {
        self.build_query(model, ctx, options)?.count()
    }

    /// Fail with [`Error::AlreadyExists`] when any record matches `options`
    pub fn check_not_exists(&self, model: &str, ctx: &RequestContext, options: &QueryOptions) -> Result<()> {
        if self.build_query(model, ctx, options)?.exists()? {
            return Err(Error::AlreadyExists(format!("A matching '{}' already exists", model)));
        }
        Ok(())
    }

    /// Slug of `value` not yet used in `column` of `model`.
    ///
    /// Taken slugs get a numeric suffix: `hello-world`, `hello-world-1`, ...
    pub fn unique_slug(&self, value: &str, model: &str, column: &str) -> Result<String> {
        let base = slugify(value);
        if base.is_empty() {
            return Err(Error::Query(format!("Cannot build a slug from '{}'", value)));
        }
        let query = self.query(model)?;
        let mut slug = base.clone();
        let mut counter = 1;
        while query.filter(Filter::eq(column, slug.as_str())).exists()? {
            slug = format!("{}-{}", base, counter);
            counter += 1;
        }
        Ok(slug)
    }

    /// Insert or replace `record` in `model`
    pub fn save(&self, model: &str, record: Record) -> Result<Record> {
        let model = self.ensure_model(model, &[])?;
        self.backend.add(&model, record)
    }

    pub fn delete(&self, model: &str, record: &Record) -> Result<bool> {
        let model = self.ensure_model(model, &[])?;
        self.backend.remove(&model, record)
    }

    /// Connect the backend; no-op when already connected
    pub fn connect(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }
        self.backend.connect()?;
        self.connected.store(true, Ordering::Release);
        info!(backend = self.backend.name(), "connected");
        Ok(())
    }

    /// Close the backend if it was connected
    pub fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.backend.close()?;
            info!(backend = self.backend.name(), "closed");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Lowercase `text`, keep alphanumeric runs and join them with `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(c);
        } else {
            gap = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust   2021 edition "), "rust-2021-edition");
        assert_eq!(slugify("Crème Brûlée"), "crème-brûlée");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::new()
            .scope("published")
            .filter("age__gte", 18)
            .order_by("name")
            .limit(5)
            .paginate(2, None);
        assert_eq!(options.scopes, vec!["published".to_string()]);
        assert_eq!(options.filters, vec![("age__gte".to_string(), Value::Int(18))]);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.paginate, Some(PageRequest { page: 2, per_page: None }));
    }
}
