use project_search::catalog::SchemaCatalog;
use project_search::config::AppConfig;
use project_search::editor::DatasetEditor;
use project_search::ingest::IngestionNormalizer;
use project_search::search::{SearchEngine, SuggestionEngine};
use project_search::store::Store;

/// Shared handler state; every component holds its own clone of the store handle
pub struct AppState {
    pub store: Store,
    pub catalog: SchemaCatalog,
    pub search: SearchEngine,
    pub suggest: SuggestionEngine,
    pub ingest: IngestionNormalizer,
    pub editor: DatasetEditor,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        Self {
            catalog: SchemaCatalog::new(store.clone()),
            search: SearchEngine::new(store.clone(), config.search.clone()),
            suggest: SuggestionEngine::new(store.clone(), config.search.clone()),
            ingest: IngestionNormalizer::from_config(store.clone(), &config.ingest),
            editor: DatasetEditor::new(store.clone()),
            store,
            config,
        }
    }
}
