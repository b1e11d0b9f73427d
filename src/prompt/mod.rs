//! Prompt catalogue per locale.

use crate::language::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    DecideSystem,
    DecideUser,
    GenerateCodeSystem,
    PythonLibraries,
    RLibraries,
    GenerateCodeUser,
    RegenerateCodeUser,
    GoalsSystem,
    GoalsUser,
    JudgeSystem,
    JudgeUser,
    RefactorSystem,
    RefactorUser,
    EvaluateSystem,
    EvaluateUser,
}

/// Replace `{name}` placeholders in one pass over the template, so inserted
/// values are never substituted again. Unknown placeholders and other braces
/// are left alone.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter().find(|(n, _)| *n == name).map(|(_, value)| (close, *value))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn render(language: Language, kind: PromptKind, vars: &[(&str, &str)]) -> String {
    fill(prompt_text(language, kind), vars)
}

pub fn prompt_text(language: Language, kind: PromptKind) -> &'static str {
    match language {
        Language::En => english(kind),
        Language::De => german(kind),
    }
}

fn english(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::DecideSystem => "You read the console output of a generated plotting script.\n\
Decide whether the output shows a real failure that must be fixed by generating the code again.\n\
A real failure is an exception or error that stops the plot from being written or aborts the rest of the script.\n\
Informational lines, progress messages and deprecation or future warnings are not failures.\n\
Answer true only if regeneration is strictly necessary, otherwise false.",
        PromptKind::DecideUser => "stdout of the script:\n'{stdout}'\n\nstderr of the script:\n'{stderr}'\n\n\
Does the code have to be regenerated?",
        PromptKind::GenerateCodeSystem => "You are an expert in data science, {programming_language} programming and data visualization.\n\
{library_instruction}\n\
Write correct, directly executable, UTF-8 encoded {programming_language} code.\n\
Each script realizes exactly ONE visualization goal and creates exactly ONE figure.\n\
Handle missing values as well as string and boolean columns gracefully.\n\
Labels, titles and legends are written in English and must not be cut off.",
        PromptKind::PythonLibraries => "Use only these libraries: pandas, numpy, matplotlib.pyplot, seaborn, geopandas.",
        PromptKind::RLibraries => "Install and load every package you need at the top of the script (install.packages / library).",
        PromptKind::GenerateCodeUser => "Write a {programming_language} script for the following visualization goal.\n\n\
Goal #{goal_index}: {question}\n\
Suggested visualization: {visualization}\n\
Rationale: {rationale}\n\n\
Load the dataset from `{dataset_path}` (separator `{delimiter}`, encoding `{encoding}`).\n\
Save the figure as a PNG file at `{output_dir}/{goal_index}_<plot_name>.png`.\n\
Print error messages instead of aborting silently.\n\n\
The first rows of the dataset:\n{preview}",
        PromptKind::RegenerateCodeUser => "The previous code produced the following output.\n\
stdout:\n'{stdout}'\n\nstderr:\n'{stderr}'\n\n\
Generate the code again and fix the errors above. Keep the file naming of the saved figure.\n\
This is the visualization goal:\n'{goal}'\n\n\
This is the previous code:\n'{code}'",
        PromptKind::GoalsSystem => "You are an experienced data analyst. You propose visualization goals for an exploratory data analysis.\n\
Each goal is a precise question about the data, a suitable chart type, and a rationale that names the columns involved.",
        PromptKind::GoalsUser => "Propose {count} visualization goals for this dataset.\n\
Only reference columns that appear in the preview.\n\n\
The first rows of the dataset (separator `{delimiter}`):\n{preview}",
        PromptKind::JudgeSystem => "You are an expert in data visualization and analytical communication.\n\
Review code that produces a chart and critique it for appropriateness of the chart type, clarity, data fidelity, aesthetics and technical correctness.\n\
Decide whether the code should be refactored.",
        PromptKind::JudgeUser => "Visualization goal:\n{goal}\n\nGenerated {programming_language} code:\n```\n{code}\n```",
        PromptKind::RefactorSystem => "You are an experienced developer who refactors visualization code based on a reviewer's critique.\n\
Return the complete refactored script. Keep the dataset loading and the output file naming unchanged.",
        PromptKind::RefactorUser => "Current code:\n--- CODE START ---\n{code}\n--- CODE END ---\n\n\
Reviewer notes:\n{critic_notes}\n\nSuggestions:\n{suggestions}\n\n\
Refactor the code accordingly and return the full source.",
        PromptKind::EvaluateSystem => "You are a critical, experienced data visualization expert evaluating code that produces a visualization.\n\
Score strictly; do not be generous. Use the six LIDA dimensions:\n\
1. bugs: syntax or logic errors that prevent execution or distort results (unusable code scores below 5).\n\
2. transformation: is the data preparation correct and appropriate for the goal?\n\
3. compliance: how well does the code meet the stated goal?\n\
4. type: is the chart type appropriate for data and question?\n\
5. encoding: are variables mapped correctly to axes, colours, shapes and sizes?\n\
6. aesthetics: layout, palette and readability.\n\
Give each dimension a score from 1 (poor) to 10 (excellent) with a specific rationale.",
        PromptKind::EvaluateUser => "VISUALIZATION GOAL:\n{goal}\n\nGenerated code:\n```{programming_language}\n{code}\n```",
    }
}

fn german(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::DecideSystem => "Du liest die Konsolenausgabe eines generierten Skripts zur Diagrammerstellung.\n\
Entscheide, ob die Ausgabe einen echten Fehler zeigt, der nur durch eine erneute Generierung des Codes behoben werden kann.\n\
Ein echter Fehler ist eine Exception oder ein Fehler, der das Speichern des Diagramms verhindert oder den restlichen Ablauf des Skripts abbricht.\n\
Hinweise, Fortschrittsmeldungen sowie Deprecation- oder Future-Warnungen sind keine Fehler.\n\
Antworte nur dann mit true, wenn eine Neugenerierung zwingend notwendig ist, sonst mit false.",
        PromptKind::DecideUser => "stdout des Skripts:\n'{stdout}'\n\nstderr des Skripts:\n'{stderr}'\n\n\
Muss der Code neu generiert werden?",
        PromptKind::GenerateCodeSystem => "Du bist Experte für Data Science, {programming_language}-Programmierung und Datenvisualisierung.\n\
{library_instruction}\n\
Schreibe korrekten, direkt ausführbaren, UTF-8-kodierten {programming_language}-Code.\n\
Jedes Skript setzt genau EIN Visualisierungsziel um und erzeugt genau EIN Diagramm.\n\
Gehe sorgfältig mit fehlenden Werten sowie String- und Boolean-Spalten um.\n\
Beschriftungen, Titel und Legenden sind auf Deutsch und dürfen nicht abgeschnitten werden.",
        PromptKind::PythonLibraries => "Nutze ausschließlich diese Bibliotheken: pandas, numpy, matplotlib.pyplot, seaborn, geopandas.",
        PromptKind::RLibraries => "Installiere und lade alle benötigten Pakete am Anfang des Skripts (install.packages / library).",
        PromptKind::GenerateCodeUser => "Schreibe ein {programming_language}-Skript für das folgende Visualisierungsziel.\n\n\
Ziel #{goal_index}: {question}\n\
Vorgeschlagene Visualisierung: {visualization}\n\
Begründung: {rationale}\n\n\
Lade den Datensatz aus `{dataset_path}` (Trennzeichen `{delimiter}`, Kodierung `{encoding}`).\n\
Speichere das Diagramm als PNG-Datei unter `{output_dir}/{goal_index}_<plot_name>.png`.\n\
Gib Fehlermeldungen aus, statt stillschweigend abzubrechen.\n\n\
Die ersten Zeilen des Datensatzes:\n{preview}",
        PromptKind::RegenerateCodeUser => "Der vorherige Code hat folgende Ausgabe erzeugt.\n\
stdout:\n'{stdout}'\n\nstderr:\n'{stderr}'\n\n\
Generiere den Code erneut und behebe die oben genannten Fehler. Behalte die Dateibenennung des gespeicherten Diagramms bei.\n\
Das ist das Visualisierungsziel:\n'{goal}'\n\n\
Das ist der vorherige Code:\n'{code}'",
        PromptKind::GoalsSystem => "Du bist eine erfahrene Datenanalystin bzw. ein erfahrener Datenanalyst und schlägst Visualisierungsziele für eine explorative Datenanalyse vor.\n\
Jedes Ziel besteht aus einer präzisen Frage an die Daten, einem passenden Diagrammtyp und einer Begründung, die die beteiligten Spalten nennt.",
        PromptKind::GoalsUser => "Schlage {count} Visualisierungsziele für diesen Datensatz vor.\n\
Verwende nur Spalten, die in der Vorschau vorkommen.\n\n\
Die ersten Zeilen des Datensatzes (Trennzeichen `{delimiter}`):\n{preview}",
        PromptKind::JudgeSystem => "Du bist Expertin bzw. Experte für Datenvisualisierung und analytische Kommunikation.\n\
Prüfe Code, der ein Diagramm erzeugt, und kritisiere ihn hinsichtlich Diagrammtyp, Klarheit, Datentreue, Ästhetik und technischer Korrektheit.\n\
Entscheide, ob der Code überarbeitet werden sollte.",
        PromptKind::JudgeUser => "Visualisierungsziel:\n{goal}\n\nGenerierter {programming_language}-Code:\n```\n{code}\n```",
        PromptKind::RefactorSystem => "Du bist eine erfahrene Entwicklerin bzw. ein erfahrener Entwickler und überarbeitest Visualisierungscode anhand einer Kritik.\n\
Gib das vollständige überarbeitete Skript zurück. Laden des Datensatzes und Dateibenennung der Ausgabe bleiben unverändert.",
        PromptKind::RefactorUser => "Aktueller Code:\n--- CODE START ---\n{code}\n--- CODE END ---\n\n\
Anmerkungen der Prüfung:\n{critic_notes}\n\nVorschläge:\n{suggestions}\n\n\
Überarbeite den Code entsprechend und gib den vollständigen Quelltext zurück.",
        PromptKind::EvaluateSystem => "Du bist eine kritische, erfahrene Expertin bzw. ein kritischer, erfahrener Experte für Datenvisualisierung und bewertest Code, der eine Visualisierung erzeugt.\n\
Bewerte streng und nicht zu wohlwollend. Verwende die sechs LIDA-Dimensionen:\n\
1. bugs: Syntax- oder Logikfehler, die die Ausführung verhindern oder Ergebnisse verfälschen (nicht lauffähiger Code unter 5).\n\
2. transformation: Ist die Datenvorbereitung korrekt und zweckmäßig für das Ziel?\n\
3. compliance: Wie gut erfüllt der Code das formulierte Ziel?\n\
4. type: Passt der Diagrammtyp zu Daten und Fragestellung?\n\
5. encoding: Werden Variablen korrekt auf Achsen, Farben, Formen und Größen abgebildet?\n\
6. aesthetics: Layout, Farben und Lesbarkeit.\n\
Vergib je Dimension eine Punktzahl von 1 (sehr schlecht) bis 10 (ausgezeichnet) mit präziser Begründung.",
        PromptKind::EvaluateUser => "VISUALISIERUNGSZIEL:\n{goal}\n\nGenerierter Code:\n```{programming_language}\n{code}\n```",
    }
}
