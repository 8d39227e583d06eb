// src/catalog/mod.rs

use serde::{Deserialize, Serialize};

/// Fixed coercion rule assigned to a target field. Not user-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    SignedInteger,
    Decimal,
    Percentage,
    Boolean,
    Date,
}

/// One column of the destination schema the pipeline knows how to populate.
/// Defined at build time; the catalog is immutable.
#[derive(Debug, Clone, Copy)]
pub struct TargetField {
    pub id: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub storage_key: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
}

/// The canonical/display date fields that may cross-derive each other
/// when only one of them is mapped.
#[derive(Debug, Clone, Copy)]
pub struct DatePair {
    /// Field holding the ISO-like `YYYY-MM-DD` form.
    pub iso_key: &'static str,
    /// Field holding the human-readable `DD-MM-YYYY` form.
    pub display_key: &'static str,
}

static PRINT_JOB_FIELDS: &[TargetField] = &[
    TargetField {
        id: "machine",
        label: "Machine",
        required: true,
        storage_key: "machine",
        aliases: &["pers", "press", "machinenaam"],
        kind: FieldKind::Text,
    },
    TargetField {
        id: "order-number",
        label: "Order number",
        required: true,
        storage_key: "order_nr",
        aliases: &["ordernr", "order nr", "order", "ordernummer"],
        kind: FieldKind::Integer,
    },
    TargetField {
        id: "job-name",
        label: "Name",
        required: true,
        storage_key: "name",
        aliases: &["naam", "omschrijving", "description"],
        kind: FieldKind::Text,
    },
    TargetField {
        id: "net-count",
        label: "Net count",
        required: false,
        storage_key: "net",
        aliases: &["netto"],
        kind: FieldKind::Decimal,
    },
    TargetField {
        id: "gross-count",
        label: "Gross count",
        required: false,
        storage_key: "gross",
        aliases: &["bruto"],
        kind: FieldKind::Decimal,
    },
    TargetField {
        id: "waste",
        label: "Waste",
        required: false,
        storage_key: "waste",
        aliases: &["inschiet", "afval"],
        kind: FieldKind::SignedInteger,
    },
    TargetField {
        id: "waste-percentage",
        label: "Waste percentage",
        required: false,
        storage_key: "waste_pct",
        aliases: &["uitval", "uitval %", "afkeur %"],
        kind: FieldKind::Percentage,
    },
    TargetField {
        id: "approved",
        label: "Approved",
        required: false,
        storage_key: "approved",
        aliases: &["akkoord", "goedgekeurd", "ok"],
        kind: FieldKind::Boolean,
    },
    TargetField {
        id: "production-date",
        label: "Date",
        required: false,
        storage_key: "date",
        aliases: &["datum", "productiedatum"],
        kind: FieldKind::Date,
    },
    TargetField {
        id: "production-date-text",
        label: "Date (text)",
        required: false,
        storage_key: "date_text",
        aliases: &["datumtekst", "datum tekst"],
        kind: FieldKind::Text,
    },
    TargetField {
        id: "record-id",
        label: "Record id",
        required: false,
        storage_key: "record_id",
        aliases: &["id", "recordid"],
        kind: FieldKind::Text,
    },
];

static MAINTENANCE_TASK_FIELDS: &[TargetField] = &[
    TargetField {
        id: "machine",
        label: "Machine",
        required: true,
        storage_key: "machine",
        aliases: &["pers", "press", "machinenaam"],
        kind: FieldKind::Text,
    },
    TargetField {
        id: "task",
        label: "Task",
        required: true,
        storage_key: "task",
        aliases: &["taak", "onderhoudstaak"],
        kind: FieldKind::Text,
    },
    TargetField {
        id: "interval-days",
        label: "Interval (days)",
        required: false,
        storage_key: "interval_days",
        aliases: &["interval", "interval dagen"],
        kind: FieldKind::Integer,
    },
    TargetField {
        id: "last-done",
        label: "Last done",
        required: false,
        storage_key: "last_done",
        aliases: &["laatst uitgevoerd", "laatste"],
        kind: FieldKind::Date,
    },
    TargetField {
        id: "done",
        label: "Done",
        required: false,
        storage_key: "done",
        aliases: &["gereed", "klaar", "afgerond"],
        kind: FieldKind::Boolean,
    },
    TargetField {
        id: "remarks",
        label: "Remarks",
        required: false,
        storage_key: "remarks",
        aliases: &["opmerking", "opmerkingen", "notes"],
        kind: FieldKind::Text,
    },
    TargetField {
        id: "record-id",
        label: "Record id",
        required: false,
        storage_key: "record_id",
        aliases: &["id", "recordid"],
        kind: FieldKind::Text,
    },
];

/// Identifies which field catalog and persisted mapping/labels apply.
/// One per import workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportProfile {
    PrintJobs,
    MaintenanceTasks,
}

impl ImportProfile {
    /// Stable key used to namespace persisted mapping/label blobs.
    pub fn key(self) -> &'static str {
        match self {
            ImportProfile::PrintJobs => "print-jobs",
            ImportProfile::MaintenanceTasks => "maintenance-tasks",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "print-jobs" => Some(ImportProfile::PrintJobs),
            "maintenance-tasks" => Some(ImportProfile::MaintenanceTasks),
            _ => None,
        }
    }

    pub fn catalog(self) -> &'static [TargetField] {
        match self {
            ImportProfile::PrintJobs => PRINT_JOB_FIELDS,
            ImportProfile::MaintenanceTasks => MAINTENANCE_TASK_FIELDS,
        }
    }

    /// Record-store collection the committed rows land in.
    pub fn collection(self) -> &'static str {
        match self {
            ImportProfile::PrintJobs => "print_jobs",
            ImportProfile::MaintenanceTasks => "maintenance_tasks",
        }
    }

    /// Storage key of the field holding the entity reference (resource name).
    pub fn entity_field(self) -> &'static str {
        "machine"
    }

    /// Entity type in the record store.
    pub fn entity_type(self) -> &'static str {
        "machine"
    }

    /// Storage key carrying a record identifier from a prior export.
    /// Rows with a value here are updates rather than creates.
    pub fn record_id_field(self) -> &'static str {
        "record_id"
    }

    /// The two date-like fields that cross-derive each other, if this
    /// profile has such a pair.
    pub fn date_pair(self) -> Option<DatePair> {
        match self {
            ImportProfile::PrintJobs => Some(DatePair {
                iso_key: "date",
                display_key: "date_text",
            }),
            ImportProfile::MaintenanceTasks => None,
        }
    }

    pub fn field(self, storage_key: &str) -> Option<&'static TargetField> {
        self.catalog().iter().find(|f| f.storage_key == storage_key)
    }
}
