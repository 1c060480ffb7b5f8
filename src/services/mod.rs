pub mod file_grouper;
pub mod outcome_writer;
pub mod page_assembler;
pub mod report_merger;
pub mod summary_backend;
pub mod summary_generator;
pub mod summary_prepender;
pub mod summary_strategy;

pub use file_grouper::FileGrouper;
pub use outcome_writer::OutcomeWriter;
pub use page_assembler::{PageAssembler, PageFragment};
pub use report_merger::{MergedReport, ReportMerger};
pub use summary_backend::{CompletionRequest, OpenAiBackend, SummaryBackend, UploadedDocument};
pub use summary_generator::{SummaryGenerator, SummaryText};
pub use summary_prepender::SummaryPrepender;
pub use summary_strategy::{
    CompliancePrompt, DocumentUploadStrategy, SummaryInput, SummaryStrategy, TableSnippetStrategy,
};
