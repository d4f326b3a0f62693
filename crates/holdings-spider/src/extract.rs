use crate::error::{ExtractionWarning, Field, SpiderError};
use crate::model::HoldingRecord;
use crate::quarter::Quarter;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Containers that hold the institutional holdings table on the source's pages.
pub const DEFAULT_ANCHORS: [&str; 4] = [
    "#institutional-holdings",
    "#holdings",
    ".institutional-holdings",
    ".holdings-table",
];

lazy_static! {
    static ref TABLE: Selector = Selector::parse("table").expect("valid selector");
    static ref ROW: Selector = Selector::parse("tr").expect("valid selector");
    static ref HEADINGS: Selector =
        Selector::parse("title, h1, h2, h3, caption").expect("valid selector");
}

/// Records read from one document, plus whatever had to be skipped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<HoldingRecord>,
    pub warnings: Vec<ExtractionWarning>,
}

impl Extraction {
    /// False when no holdings table was found at all, as opposed to a table with no rows.
    pub fn anchor_found(&self) -> bool {
        !self.warnings.contains(&ExtractionWarning::AnchorNotFound)
    }

    pub fn dropped_rows(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, ExtractionWarning::MalformedRow { .. }))
            .count()
    }
}

/// Reads holding records out of holdings-page markup.
///
/// The table is found through anchor containers first and then by its header row, and each
/// column is identified by what its header says rather than where it sits, so reshuffled
/// layouts still parse.
#[derive(Debug, Clone)]
pub struct Extractor {
    anchors: Vec<Selector>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            anchors: DEFAULT_ANCHORS
                .iter()
                .filter_map(|anchor| Selector::parse(anchor).ok())
                .collect(),
        }
    }
}

impl Extractor {
    pub fn with_anchors<S: AsRef<str>>(anchors: &[S]) -> Result<Self, SpiderError> {
        let anchors = anchors
            .iter()
            .map(|anchor| {
                let anchor = anchor.as_ref();
                Selector::parse(anchor)
                    .map_err(|err| SpiderError::Config(format!("bad anchor {anchor:?}, {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { anchors })
    }

    /// The default anchors, unless `HOLDINGS_ANCHORS` lists comma-separated selectors instead.
    pub fn from_env() -> Result<Self, SpiderError> {
        match dotenv::var("HOLDINGS_ANCHORS") {
            Ok(anchors) => {
                debug!("holdings anchors from environment: {anchors}");
                Self::with_anchors(&anchor_list(&anchors))
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);

        let Some((table, columns)) = self
            .candidates(&document)
            .into_iter()
            .find_map(|table| Columns::detect(table).map(|columns| (table, columns)))
        else {
            warn!("{}", ExtractionWarning::AnchorNotFound);
            return Extraction {
                records: Vec::new(),
                warnings: vec![ExtractionWarning::AnchorNotFound],
            };
        };
        debug!("holdings table located, columns {columns:?}");

        let mut extraction = Extraction::default();
        let data_rows = own_rows(table)
            .skip(columns.header_row + 1)
            .filter(|row| own_cells(*row).any(|cell| cell.value().name() == "td"));

        for (index, row) in data_rows.enumerate() {
            let cells: Vec<String> = own_cells(row).map(cell_text).collect();
            match columns.record(&cells) {
                Ok(record) => {
                    trace!("row {}: {}", index + 1, record.institution_name);
                    extraction.records.push(record);
                }
                Err(missing) => {
                    let warning = ExtractionWarning::MalformedRow {
                        row: index + 1,
                        missing,
                    };
                    warn!("{warning}");
                    extraction.warnings.push(warning);
                }
            }
        }

        extraction
    }

    /// The quarter a page says it shows, read from its title, headings and table captions.
    pub fn page_quarter(&self, html: &str) -> Option<Quarter> {
        let document = Html::parse_document(html);
        let quarter = document
            .select(&HEADINGS)
            .find_map(|heading| Quarter::find_in(&cell_text(heading)));
        quarter
    }

    /// Tables under the anchors, then every other table, each once.
    fn candidates<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let mut seen = HashSet::new();
        let anchored = self.anchors.iter().flat_map(|anchor| {
            document.select(anchor).flat_map(|container| {
                let own = (container.value().name() == "table").then_some(container);
                own.into_iter().chain(container.select(&TABLE))
            })
        });

        anchored
            .chain(document.select(&TABLE))
            .filter(|table| seen.insert(table.id()))
            .collect()
    }
}

/// Which column plays which role, and which row carries the headers.
#[derive(Debug, Default, PartialEq, Eq)]
struct Columns {
    header_row: usize,
    institution: Option<usize>,
    shares: Option<usize>,
    market_value: Option<usize>,
    percent: Option<usize>,
}

impl Columns {
    fn detect(table: ElementRef<'_>) -> Option<Self> {
        let rows: Vec<ElementRef<'_>> = own_rows(table).collect();
        let header_row = rows
            .iter()
            .position(|row| own_cells(*row).any(|cell| cell.value().name() == "th"))
            .unwrap_or(0);
        let headers = rows.get(header_row)?;

        let mut columns = Self {
            header_row,
            ..Self::default()
        };
        for (i, header) in own_cells(*headers).map(cell_text).enumerate() {
            let slot = match role_of(&header) {
                Some(Field::Institution) => &mut columns.institution,
                Some(Field::Shares) => &mut columns.shares,
                Some(Field::MarketValue) => &mut columns.market_value,
                Some(Field::PercentOfPortfolio) => &mut columns.percent,
                None => continue,
            };
            slot.get_or_insert(i);
        }

        let others = [columns.shares, columns.market_value, columns.percent]
            .iter()
            .flatten()
            .count();
        (columns.institution.is_some() && others > 0).then_some(columns)
    }

    /// Build a record from a row's cell texts, or name the first field that is absent.
    fn record(&self, cells: &[String]) -> Result<HoldingRecord, Field> {
        let take = |column: Option<usize>, field: Field| {
            column
                .and_then(|i| cells.get(i))
                .filter(|text| !text.is_empty())
                .cloned()
                .ok_or(field)
        };

        Ok(HoldingRecord {
            institution_name: take(self.institution, Field::Institution)?,
            shares: take(self.shares, Field::Shares)?,
            market_value: take(self.market_value, Field::MarketValue)?,
            percent_of_portfolio: take(self.percent, Field::PercentOfPortfolio)?,
        })
    }
}

// a table's own rows; rows of tables nested inside its cells belong to those tables
fn own_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    table.select(&ROW).filter(move |row| {
        row.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table")
            .map(|owner| owner.id())
            == Some(table.id())
    })
}

fn own_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
}

fn anchor_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|anchor| !anchor.is_empty())
        .collect()
}

fn role_of(header: &str) -> Option<Field> {
    let header = header.to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|key| header.contains(key));

    if has(&["%", "percent", "portfolio"]) {
        Some(Field::PercentOfPortfolio)
    } else if has(&["share"]) {
        Some(Field::Shares)
    } else if has(&["value", "market"]) {
        Some(Field::MarketValue)
    } else if has(&["institution", "fund", "name", "holder", "investor", "manager"]) {
        Some(Field::Institution)
    } else {
        None
    }
}

// collapse runs of whitespace (non-breaking spaces included); nothing else is touched
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
