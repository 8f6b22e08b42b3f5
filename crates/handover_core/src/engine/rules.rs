//! Keyword-triggered task generation.
//!
//! # Responsibility
//! - Scan a patient's free text (status, flags, diagnosis, explicit tasks)
//!   against an ordered trigger table.
//! - Emit one generated task per template of every rule that fires.
//!
//! # Invariants
//! - Rules are evaluated in full; several may fire for one patient.
//! - Output order follows table order, then template order.
//! - Triggers are disjoint: `BS` (bladder scan) never satisfies the diabetes
//!   trigger.
//! - Identifiers are fresh on every call; cross-scan stability is handled by
//!   the merger.

use crate::model::patient::PatientEntry;
use crate::model::task::{Task, Urgency};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use Urgency::{Morning, Routine, Stat, Urgent};

/// One `(text, urgency)` checklist item.
type Template = (&'static str, Urgency);

/// Trigger pattern, source label and checklist.
pub struct Rule {
    trigger: Regex,
    source: &'static str,
    templates: &'static [Template],
}

impl Rule {
    fn new(pattern: &str, source: &'static str, templates: &'static [Template]) -> Self {
        Self {
            trigger: Regex::new(pattern).expect("valid rule trigger regex"),
            source,
            templates,
        }
    }

    /// Label stamped into `generated_from`.
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Whether the trigger matches anywhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.trigger.is_match(text)
    }

    fn emit(&self) -> impl Iterator<Item = Task> + '_ {
        self.templates
            .iter()
            .map(|(text, urgency)| Task::generated(*text, *urgency, self.source))
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            r"משתחרר|שחרור|לשחרר",
            "משתחרר היום",
            &[
                ("סיכום מחלה", Morning),
                ("מכתב שחרור", Morning),
                ("הסבר תרופות לשחרור למטופל/משפחה", Routine),
                ("תיאום המשך טיפול (רופא משפחה / מרפאה)", Routine),
            ],
        ),
        Rule::new(
            r"(?i)\bNPO\b",
            "NPO",
            &[
                ("לוודא צום - ללא אוכל ושתייה", Stat),
                ("עירוי נוזלים תחזוקה", Urgent),
                ("עדכן צוות סיעוד על NPO", Stat),
            ],
        ),
        Rule::new(
            r"(?i)ניתוח|\bpre.?op\b",
            "טרום ניתוח",
            &[
                ("בדיקות דם טרום ניתוח (CBC, כימיה, קרישה)", Stat),
                ("חתימת הסכמה לניתוח", Urgent),
                ("התייעצות הרדמה", Urgent),
                ("א.ק.ג טרום ניתוח", Urgent),
                ("בדיקת אשלגן לפני ניתוח", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)עירוי דם|מנת דם|\bPRBCs?\b",
            "עירוי דם",
            &[
                ("סוג ושתלב (T&C)", Stat),
                ("הכנת גישה ורידית", Urgent),
                ("ניטור סימנים חיוניים כל 15 דק' בשעה הראשונה", Stat),
                ("בדיקת Hb לאחר העירוי", Morning),
            ],
        ),
        Rule::new(
            r"(?i)סוכרת|אינסולין|\bDM\b",
            "סוכרת",
            &[
                ("מדידת סוכר לפני 3 ארוחות ולפני שינה", Morning),
                ("בדיקת HbA1c אם חסר", Routine),
                ("בדיקת כפות רגליים", Routine),
            ],
        ),
        Rule::new(
            r"(?i)נפילה|\bFALL\b",
            "סיכון נפילה",
            &[
                ("מעקה מיטה מורם", Stat),
                ("פעמון בהישג יד", Stat),
                ("הצמדת שטיח אנטי-סליפ", Urgent),
                ("סקירת תרופות המגבירות סיכון נפילה", Morning),
            ],
        ),
        Rule::new(
            r"(?i)\bBS\b|bladder\s*scan|בלדר\s*סקאן|סריקה\s*של\s*שלפוחית",
            "BS (Bladder Scan)",
            &[("BS (Bladder Scan)", Routine)],
        ),
        Rule::new(
            r"(?i)בידוד|\bISO\b|\bMRSA\b|\bVRE\b|\bESBL\b|\bC\.?\s?DIFF\b",
            "בידוד",
            &[
                ("שילוט בידוד על הדלת", Stat),
                ("ציוד מגן אישי בכניסה (כפפות, חלוק)", Stat),
                ("הנחיית צוות וביקור משפחה על נהלי בידוד", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)קטטר|catheter|פולי",
            "קטטר",
            &[
                ("בדיקת צורך בהמשך קטטר (הסרה מוקדמת אם אפשר)", Morning),
                ("תיעוד כמות שתן בטבלת I&O", Routine),
            ],
        ),
        Rule::new(
            r"(?i)\bAKI\b|אי ספיקת כליות|כשל כלייתי|קריאטינין|creatinine",
            "AKI",
            &[
                ("מעקב קריאטינין ואלקטרוליטים יומי", Morning),
                ("הסרת תרופות נפרוטוקסיות (NSAIDs, אמינוגליקוזידים)", Urgent),
                ("מדידת I&O מדויקת", Urgent),
                ("שקילת מטופל יומית", Morning),
                ("בדיקת אשלגן דחופה", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)חומר ניגוד|CT עם חומר|contrast",
            "חומר ניגוד",
            &[
                ("בדיקת קריאטינין לפני מתן חומר ניגוד", Urgent),
                ("הידרציה IV לפני ואחרי (אם כליות לא תקינות)", Urgent),
                ("הפסקת מטפורמין 48 שעות", Urgent),
                ("בדיקת קריאטינין 48 שעות לאחר חומר ניגוד", Routine),
            ],
        ),
        Rule::new(
            r"(?i)דליריום|בלבול|אי שקט|אגיטציה|delirium|encephalopathy",
            "דליריום",
            &[
                ("CAM score - הערכת דליריום", Urgent),
                ("בדיקת סיבה: זיהום, תרופות, כאב, שתן", Urgent),
                ("הפחתת תרופות אנטיכולינרגיות ובנזו", Urgent),
                ("הימנעות מקשירה - ניסיון מוגבר", Urgent),
                ("ריאוריינטציה: אור טבעי, שעון, פעילות", Routine),
                ("בדיקת שמיעה וראייה (עזרים זמינים?)", Routine),
            ],
        ),
        Rule::new(
            r"(?i)פצע לחץ|eschar|decubitus|פצע עריסה|כיב לחץ",
            "פצע לחץ",
            &[
                ("הפניה לאחות פצעים", Urgent),
                ("החלפת תנוחה כל 2 שעות", Urgent),
                ("מזרן למניעת פצעי לחץ", Urgent),
                ("הערכת תזונה - התייעצות דיאטנית", Morning),
            ],
        ),
        Rule::new(
            r"(?i)\bDVT\b|פקק דם|קרישיות|\bLMWH\b|קלקסן|anticoag|נוגד קרישה",
            "קרישיות",
            &[
                ("בדיקת CBC + קואגולציה", Morning),
                ("וידוא מינון LMWH מותאם לכליות (eGFR)", Urgent),
                ("הנחיות למניעת DVT: גרביים, מוביליזציה", Morning),
            ],
        ),
        Rule::new(
            r"(?i)אי ספיקת לב|\bCHF\b|heart failure|קוצר נשימה|dyspnea|edema|בצקת",
            "אי ספיקת לב",
            &[
                ("שקילה יומית ותיעוד", Morning),
                ("מדידת I&O יומית", Morning),
                ("בדיקת אלקטרוליטים (K, Mg) בגלל משתנים", Morning),
                ("בדיקת קריאטינין (תחת פוראסמיד)", Morning),
            ],
        ),
        Rule::new(
            r"(?i)דלקת ריאות|pneumonia|זיהום|sepsis|ספסיס|חום|fever",
            "זיהום",
            &[
                ("תרבית דם לפני אנטיביוטיקה (אם עדיין לא)", Stat),
                ("בדיקת CRP + WBC + PCT", Morning),
                ("ניטור חום כל 4 שעות", Urgent),
                ("בדיקת תרבית שתן אם חום ללא מקור", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)שבץ|\bstroke\b|\bCVA\b|\bTIA\b|נוירולוגי",
            "שבץ",
            &[
                ("הערכת בליעה לפני אכילה/שתייה", Urgent),
                ("מניעת נפילה - ניטור מוגבר", Urgent),
                ("א.ק.ג לזיהוי AF", Urgent),
                ("ייעוץ קלינאי תקשורת", Morning),
            ],
        ),
        Rule::new(
            r"(?i)תת תזונה|malnutrition|\bNGT\b|\bPEG\b|זונדה|הזנה|בליעה",
            "תזונה",
            &[
                ("הפניה לדיאטנית קלינית", Morning),
                ("הערכת בליעה (אם רלוונטי)", Urgent),
                ("מדידת משקל שבועית", Routine),
                ("בדיקת albumin + prealbumin", Routine),
            ],
        ),
        Rule::new(
            r"(?i)היפרקלמיה|hyperkalemia|אשלגן גבוה",
            "היפרקלמיה",
            &[
                ("א.ק.ג דחוף", Stat),
                ("בדיקת אשלגן חוזרת", Stat),
                ("Calcium gluconate IV אם שינויים ב-ECG", Stat),
                ("הפסקת ACE/ARB ו-K-sparers", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)היפונתרמיה|hyponatremia|נתרן נמוך",
            "היפונתרמיה",
            &[
                ("הגבלת נוזלים (אם SIADH)", Urgent),
                ("מעקב נתרן כל 6-8 שעות", Urgent),
                ("בדיקת אוסמולריות שתן ודם", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)היפוגליקמיה|hypoglycemia|סוכר נמוך",
            "היפוגליקמיה",
            &[
                ("מדידת סוכר כל שעה עד יציבות", Stat),
                ("D50 IV אם אין גישה ורידית - גלוקגון IM", Stat),
                ("בדיקת סיבה: מינון אינסולין, NPO, כליות", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)מרופנם|meropenem|פיפרציל|tazobactam|ונקומיצין|vancomycin|אנטיביוטיקה IV",
            "אנטיביוטיקה IV",
            &[
                ("וידוא גישה ורידית תקינה", Urgent),
                ("בדיקת רמות vancomycin אם רלוונטי", Morning),
                ("בדיקת קריאטינין תחת טיפול נפרוטוקסי", Morning),
            ],
        ),
        Rule::new(
            r"\bDNR\b|\bDNI\b",
            "DNR/DNI",
            &[
                ("וידוא טופס DNR חתום בתיק", Urgent),
                ("עדכון צוות סיעוד על הנחיות DNR/DNI", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)וורפרין|warfarin|coumadin|\bINR\b",
            "וורפרין",
            &[
                ("בדיקת INR יומי עד טווח טיפולי", Morning),
                ("התאמת מינון לפי INR", Morning),
            ],
        ),
        Rule::new(
            r"(?i)אשלגן נמוך|היפוקלמיה|hypokalemia|תיקון אשלגן",
            "היפוקלמיה",
            &[
                ("מתן אשלגן PO/IV לפי פרוטוקול", Urgent),
                ("מעקב אשלגן כל 4-6 שעות", Urgent),
                ("א.ק.ג אם K < 3.0", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)פיזיותרפיה|ריפוי בעיסוק|שיקום|mobilize|מוביליזציה",
            "שיקום",
            &[
                ("הפניה לפיזיותרפיה", Morning),
                ("הפניה לריפוי בעיסוק", Routine),
                ("יעד: מוביליזציה מוקדמת פעמיים ביום", Morning),
            ],
        ),
        Rule::new(
            r"(?i)עובד סוציאלי|social work|הסתגלות|בית אבות|מוסד",
            "עובד סוציאלי",
            &[
                ("הפניה לעובד סוציאלי", Morning),
                ("שיחת משפחה על תכנית שחרור", Routine),
            ],
        ),
        Rule::new(
            r"(?i)כאב חזק|כאב בלתי נשלט|\bNRS [789]\b|\bVAS [789]\b|pain control",
            "ניהול כאב",
            &[
                ("הערכת כאב NRS כל 4 שעות", Urgent),
                ("ייעוץ רפואת כאב", Morning),
                ("בדיקת טיפול נוכחי ואופטימיזציה", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)דמנציה|אלצהיימר|dementia|alzheimer|ירידה קוגניטיבית",
            "דמנציה",
            &[
                ("הערכת מצב קוגניטיבי (MMSE/MoCA בהתאם)", Routine),
                ("מניעת דליריום: ריאוריינטציה, אור, שגרה", Morning),
                ("מניעת נפילה - ניטור מוגבר", Urgent),
            ],
        ),
        Rule::new(
            r"(?i)שבר ירך|hip fracture|אוסטאופורוזיס|osteoporosis",
            "שבר ירך / אוסטאופורוזיס",
            &[
                ("וידוא מתן ויטמין D + סידן", Morning),
                ("הפניה לאורתופד אם נדרש", Urgent),
                ("מניעת DVT: LMWH + גרביים", Urgent),
            ],
        ),
    ]
});

/// Returns the rule table in evaluation order.
pub fn rules() -> &'static [Rule] {
    RULES.as_slice()
}

/// Joins the text fields rules are evaluated against.
///
/// Order: status notes, flags, diagnosis, explicit task text.
pub fn trigger_text(entry: &PatientEntry) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(entry.status.iter().map(String::as_str));
    parts.extend(entry.flags.iter().map(String::as_str));
    parts.push(entry.diagnosis.as_deref().unwrap_or_default());
    parts.extend(entry.tasks.iter().map(|task| task.text.as_str()));
    parts.join(" ")
}

/// Labels of every rule that fires for `entry`, in table order.
pub fn matching_rules(entry: &PatientEntry) -> Vec<&'static str> {
    let text = trigger_text(entry);
    rules()
        .iter()
        .filter(|rule| rule.matches(&text))
        .map(Rule::source)
        .collect()
}

/// Generates follow-up tasks for every rule whose trigger matches.
pub fn apply_rules(entry: &PatientEntry) -> Vec<Task> {
    let text = trigger_text(entry);
    let mut fired = 0_usize;
    let generated: Vec<Task> = rules()
        .iter()
        .filter(|rule| rule.matches(&text))
        .inspect(|_| fired += 1)
        .flat_map(|rule| rule.emit())
        .collect();

    debug!(
        "event=rules_apply module=rules status=ok rules_fired={} tasks={}",
        fired,
        generated.len()
    );
    generated
}
