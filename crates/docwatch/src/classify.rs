use std::fmt;

use tracing::warn;

/// Document classification used to partition output stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    ApInvoice,
    OutgoingPayments,
    IncomingPayments,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ApInvoice,
        Category::OutgoingPayments,
        Category::IncomingPayments,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ApInvoice => "ap_invoice",
            Category::OutgoingPayments => "outgoing_payments",
            Category::IncomingPayments => "incoming_payments",
            Category::Unknown => "unknown",
        }
    }

    /// Maps a stage-1 document type label to a category, ignoring case.
    /// Anything unrecognised (including an empty label) is `Unknown`.
    pub fn classify(label: &str) -> Category {
        let known = [
            Category::ApInvoice,
            Category::OutgoingPayments,
            Category::IncomingPayments,
        ];

        match known
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
        {
            Some(category) => category,
            None => {
                warn!("Unknown document type: {:?}", label);
                Category::Unknown
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
