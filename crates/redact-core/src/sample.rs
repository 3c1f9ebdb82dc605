//! Simple text PDFs for seeding and test fixtures
//!
//! Pages are US Letter with 72pt margins, set in Helvetica (WinAnsiEncoding)
//! with an explicit `/Widths` table so that glyph positions can be computed
//! exactly when the text is later redacted. Content streams are left
//! uncompressed.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::coords::PageSize;
use crate::error::GenerationError;

const FONT_NAME: &[u8] = b"F1";
const FIRST_CHAR: u8 = 32;
const MARGIN: f64 = 72.0;

/// Helvetica advance widths for codes 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // 58..64
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // 91..96
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // 123..126
];

/// Advance of `text` in points at `size`
pub fn text_width(text: &str, size: f64) -> f64 {
    encode(text)
        .iter()
        .map(|b| f64::from(HELVETICA_WIDTHS[usize::from(b - FIRST_CHAR)]))
        .sum::<f64>()
        * size
        / 1000.0
}

/// Printable ASCII only; anything else becomes `?`
fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            _ => b'?',
        })
        .collect()
}

/// One line of text, positioned by its baseline origin in PDF user space
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub text: String,
}

impl TextRun {
    pub fn new(x: f64, y: f64, size: f64, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            size,
            text: text.into(),
        }
    }
}

/// Build a Letter-sized PDF with one page per entry of `pages`
pub fn simple_pdf(pages: &[Vec<TextRun>]) -> Result<Vec<u8>, GenerationError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => i64::from(FIRST_CHAR),
        "LastChar" => 126,
        "Widths" => HELVETICA_WIDTHS
            .iter()
            .map(|w| Object::Integer(i64::from(*w)))
            .collect::<Vec<_>>(),
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let size = PageSize::LETTER;
    let mut kids = Vec::with_capacity(pages.len());
    for runs in pages {
        let content = Content {
            operations: page_operations(runs),
        };
        let encoded = content
            .encode()
            .map_err(|e| GenerationError::Write(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(size.width as f32), Object::Real(size.height as f32)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| GenerationError::Write(e.to_string()))?;
    Ok(bytes)
}

fn page_operations(runs: &[TextRun]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(runs.len() * 5);
    for run in runs {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_NAME.to_vec()), Object::Real(run.size as f32)],
        ));
        ops.push(Operation::new(
            "Td",
            vec![Object::Real(run.x as f32), Object::Real(run.y as f32)],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode(&run.text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Flowed content of a sample document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(&'static str),
    /// Explicit line breaks are kept
    Paragraph(&'static str),
    Space,
    PageBreak,
}

const TITLE_SIZE: f64 = 24.0;
const HEADING_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 11.0;
const BODY_LEADING: f64 = 14.0;
const BLOCK_GAP: f64 = 12.0;
const SPACER: f64 = 14.4;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleDocument {
    pub title: &'static str,
    pub filename: &'static str,
    pub blocks: Vec<Block>,
}

impl SampleDocument {
    /// Lay the blocks out top to bottom, starting a new page when the bottom
    /// margin is reached
    pub fn layout(&self) -> Vec<Vec<TextRun>> {
        let mut flow = Flow::new();
        let title_x = (PageSize::LETTER.width - text_width(self.title, TITLE_SIZE)) / 2.0;
        flow.line(title_x.max(MARGIN), self.title, TITLE_SIZE, TITLE_SIZE * 1.2);
        flow.skip(BLOCK_GAP * 2.0);

        for block in &self.blocks {
            match block {
                Block::Heading(text) => {
                    flow.skip(BLOCK_GAP);
                    for line in wrap(text, HEADING_SIZE, flow.width()) {
                        flow.line(MARGIN, &line, HEADING_SIZE, HEADING_SIZE * 1.2);
                    }
                    flow.skip(BLOCK_GAP);
                }
                Block::Paragraph(text) => {
                    for segment in text.split('\n') {
                        for line in wrap(segment, BODY_SIZE, flow.width()) {
                            flow.line(MARGIN, &line, BODY_SIZE, BODY_LEADING);
                        }
                    }
                    flow.skip(BLOCK_GAP);
                }
                Block::Space => flow.skip(SPACER),
                Block::PageBreak => flow.break_page(),
            }
        }
        flow.finish()
    }

    pub fn build_pdf(&self) -> Result<Vec<u8>, GenerationError> {
        simple_pdf(&self.layout())
    }
}

/// Cursor over the pages being filled
struct Flow {
    pages: Vec<Vec<TextRun>>,
    current: Vec<TextRun>,
    /// Top of the next line, in PDF user space
    cursor: f64,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor: PageSize::LETTER.height - MARGIN,
        }
    }

    fn width(&self) -> f64 {
        PageSize::LETTER.width - 2.0 * MARGIN
    }

    fn line(&mut self, x: f64, text: &str, size: f64, leading: f64) {
        if self.cursor - leading < MARGIN {
            self.break_page();
        }
        // Baseline sits one font size below the line top
        self.current
            .push(TextRun::new(x, self.cursor - size, size, text));
        self.cursor -= leading;
    }

    fn skip(&mut self, amount: f64) {
        self.cursor -= amount;
    }

    fn break_page(&mut self) {
        if !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.cursor = PageSize::LETTER.height - MARGIN;
    }

    fn finish(mut self) -> Vec<Vec<TextRun>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Greedy word wrap by Helvetica widths; an empty input yields one empty line
fn wrap(text: &str, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if !line.is_empty() && text_width(&candidate, size) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    lines.push(line);
    lines
}

/// The three documents created by `redact-server seed`
pub fn sample_documents() -> Vec<SampleDocument> {
    vec![employment_contract(), nda(), settlement_agreement()]
}

const WITNESS: &str = "IN WITNESS WHEREOF, the parties have executed this Agreement as of the date first above written.";

fn employment_contract() -> SampleDocument {
    use Block::*;
    SampleDocument {
        title: "Employment Contract - Confidential",
        filename: "employment_contract.pdf",
        blocks: vec![
            Heading("EMPLOYMENT AGREEMENT"),
            Space,
            Paragraph("This Employment Agreement (the \"Agreement\") is entered into as of January 15, 2024, by and between TechCorp Industries, Inc., a Delaware corporation (the \"Company\"), and Jane Smith, an individual residing at 123 Main Street, San Francisco, CA 94102 (the \"Employee\")."),
            Heading("1. POSITION AND DUTIES"),
            Paragraph("The Company hereby employs the Employee, and the Employee hereby accepts employment with the Company, as Senior Software Engineer. The Employee shall report to the Chief Technology Officer and shall perform such duties as are customarily associated with such position, including but not limited to software development, code review, and technical mentoring."),
            Paragraph("The Employee agrees to devote their full business time, attention, and energies to the business of the Company and to perform their duties in a professional, ethical, and efficient manner."),
            Heading("2. COMPENSATION"),
            Paragraph("As compensation for services rendered, the Company shall pay the Employee a base salary of $185,000 per annum, payable in accordance with the Company's standard payroll practices. The Employee's salary shall be subject to review annually."),
            Paragraph("In addition to base salary, the Employee shall be eligible for an annual performance bonus of up to 20% of base salary, based on individual and company performance metrics as determined by the Company in its sole discretion."),
            PageBreak,
            Heading("3. BENEFITS"),
            Paragraph("The Employee shall be entitled to participate in all employee benefit plans, practices, and programs maintained by the Company, including health insurance, dental insurance, vision insurance, 401(k) retirement plan, and paid time off, as in effect from time to time, on a basis commensurate with the Employee's position."),
            Heading("4. CONFIDENTIALITY AND PROPRIETARY INFORMATION"),
            Paragraph("The Employee acknowledges that during their employment, they will have access to and become acquainted with various trade secrets and confidential information concerning the Company's business, including but not limited to customer lists, pricing information, software source code, technical specifications, and business strategies."),
            Paragraph("The Employee agrees that they will not, during or after the term of employment, disclose any such confidential information to any person or entity, or use such information for their own benefit or the benefit of any third party, without the prior written consent of the Company."),
            Heading("5. TERMINATION"),
            Paragraph("Either party may terminate this Agreement at any time, with or without cause, upon providing thirty (30) days written notice to the other party. Upon termination, the Employee shall return all Company property and confidential information in their possession."),
            PageBreak,
            Heading("6. GOVERNING LAW"),
            Paragraph("This Agreement shall be governed by and construed in accordance with the laws of the State of California, without regard to its conflict of laws provisions."),
            Space,
            Paragraph(WITNESS),
            Space,
            Space,
            Paragraph("_________________________\nTechCorp Industries, Inc.\nBy: John Doe, CEO\nDate: January 15, 2024"),
            Space,
            Paragraph("_________________________\nJane Smith, Employee\nDate: January 15, 2024"),
        ],
    }
}

fn nda() -> SampleDocument {
    use Block::*;
    SampleDocument {
        title: "Non-Disclosure Agreement (NDA)",
        filename: "nda_agreement.pdf",
        blocks: vec![
            Heading("NON-DISCLOSURE AGREEMENT"),
            Space,
            Paragraph("This Non-Disclosure Agreement (the \"Agreement\") is entered into as of March 1, 2024, between Global Tech Solutions LLC, a California limited liability company with offices at 456 Innovation Drive, Palo Alto, CA 94301 (the \"Disclosing Party\"), and Robert Johnson, an individual with an address at 789 Elm Street, Mountain View, CA 94041 (the \"Receiving Party\")."),
            Heading("RECITALS"),
            Paragraph("WHEREAS, the Disclosing Party possesses certain confidential and proprietary information relating to its business, technology, and operations; and"),
            Paragraph("WHEREAS, the Receiving Party desires to receive certain confidential information from the Disclosing Party for the purpose of evaluating a potential business relationship;"),
            Paragraph("NOW, THEREFORE, in consideration of the mutual covenants and agreements contained herein, the parties agree as follows:"),
            Heading("1. DEFINITION OF CONFIDENTIAL INFORMATION"),
            Paragraph("\"Confidential Information\" means all information, whether written, oral, electronic, or visual, disclosed by the Disclosing Party to the Receiving Party, including but not limited to technical data, trade secrets, know-how, research, product plans, customer lists, software, inventions, processes, designs, marketing, finances, or other business information."),
            PageBreak,
            Heading("2. OBLIGATIONS OF RECEIVING PARTY"),
            Paragraph("The Receiving Party agrees to: (a) hold and maintain the Confidential Information in strictest confidence; (b) not disclose the Confidential Information to any third parties without the prior written consent of the Disclosing Party; (c) not use the Confidential Information for any purpose except as specifically contemplated by the parties; and (d) protect the Confidential Information using the same degree of care it uses to protect its own confidential information, but in no event less than reasonable care."),
            Heading("3. EXCLUSIONS FROM CONFIDENTIAL INFORMATION"),
            Paragraph("Confidential Information shall not include information that: (a) is or becomes publicly available without breach of this Agreement; (b) was rightfully in the Receiving Party's possession prior to disclosure by the Disclosing Party; (c) is rightfully received by the Receiving Party from a third party without breach of any confidentiality obligation; or (d) is independently developed by the Receiving Party without use of or reference to the Confidential Information."),
            Heading("4. TERM AND TERMINATION"),
            Paragraph("This Agreement shall commence on the date first written above and shall continue for a period of five (5) years. The obligations of confidentiality shall survive termination of this Agreement and shall continue for an additional three (3) years thereafter."),
            PageBreak,
            Heading("5. RETURN OF MATERIALS"),
            Paragraph("Upon termination of this Agreement or upon request by the Disclosing Party, the Receiving Party shall promptly return all documents, materials, and other tangible items containing or representing Confidential Information, and all copies thereof, or shall certify in writing that all such materials have been destroyed."),
            Heading("6. REMEDIES"),
            Paragraph("The Receiving Party acknowledges that unauthorized disclosure or use of Confidential Information may cause irreparable harm to the Disclosing Party for which monetary damages may be inadequate. Accordingly, the Disclosing Party shall be entitled to seek equitable relief, including injunction and specific performance, in addition to all other remedies available at law or in equity."),
            Space,
            Paragraph(WITNESS),
            Space,
            Space,
            Paragraph("_________________________\nGlobal Tech Solutions LLC\nBy: Sarah Williams, General Counsel\nDate: March 1, 2024"),
            Space,
            Paragraph("_________________________\nRobert Johnson\nDate: March 1, 2024"),
        ],
    }
}

fn settlement_agreement() -> SampleDocument {
    use Block::*;
    SampleDocument {
        title: "Settlement Agreement",
        filename: "settlement_agreement.pdf",
        blocks: vec![
            Heading("SETTLEMENT AND RELEASE AGREEMENT"),
            Space,
            Paragraph("This Settlement and Release Agreement (the \"Agreement\") is entered into as of June 15, 2024, by and between Michael Anderson, an individual residing at 321 Oak Avenue, Seattle, WA 98101 (the \"Claimant\"), and Acme Corporation, a Washington corporation with its principal place of business at 555 Business Park Drive, Bellevue, WA 98004 (the \"Company\")."),
            Heading("RECITALS"),
            Paragraph("WHEREAS, the Claimant was employed by the Company from January 2020 through December 2023;"),
            Paragraph("WHEREAS, certain disputes and claims have arisen between the parties relating to the Claimant's employment and termination thereof (the \"Disputes\");"),
            Paragraph("NOW, THEREFORE, in consideration of the mutual promises, covenants, and agreements set forth herein, the parties agree as follows:"),
            Heading("1. SETTLEMENT PAYMENT"),
            Paragraph("In full and complete settlement of all claims, the Company agrees to pay the Claimant the sum of Seventy-Five Thousand Dollars ($75,000.00) (the \"Settlement Payment\"). The Settlement Payment shall be paid within fifteen (15) business days of the execution of this Agreement by both parties."),
            PageBreak,
            Heading("2. GENERAL RELEASE BY CLAIMANT"),
            Paragraph("In consideration of the Settlement Payment and the other terms of this Agreement, the Claimant hereby irrevocably and unconditionally releases, acquits, and forever discharges the Company, its officers, directors, employees, agents, shareholders, affiliates, successors, and assigns from any and all claims, demands, damages, liabilities, obligations, actions, and causes of action of every kind and nature whatsoever, whether known or unknown, which the Claimant has or may have against the Company."),
            Heading("3. NON-ADMISSION"),
            Paragraph("This Agreement is entered into as a compromise and settlement of disputed claims. Nothing contained herein shall be construed as an admission by either party of any liability, wrongdoing, or violation of law."),
            PageBreak,
            Heading("4. CONFIDENTIALITY"),
            Paragraph("The parties agree that the terms and conditions of this Agreement, including but not limited to the amount of the Settlement Payment, shall be kept strictly confidential. Neither party shall disclose the existence or terms of this Agreement to any third party, except as required by law or except to their attorneys, accountants, tax advisors, or immediate family members."),
            Heading("5. NON-DISPARAGEMENT"),
            Paragraph("The Claimant agrees not to make any disparaging or negative statements, written or oral, about the Company, its officers, directors, employees, products, services, or business practices."),
            Heading("6. GOVERNING LAW"),
            Paragraph("This Agreement shall be governed by and construed in accordance with the laws of the State of Washington, without regard to its conflict of laws principles."),
            Space,
            Paragraph(WITNESS),
            Space,
            Space,
            Paragraph("_________________________\nAcme Corporation\nBy: David Martinez, Chief Legal Officer\nDate: June 15, 2024"),
            Space,
            Paragraph("_________________________\nMichael Anderson\nDate: June 15, 2024"),
        ],
    }
}
