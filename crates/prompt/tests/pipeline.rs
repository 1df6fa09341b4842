//! End-to-end: template text is parsed, resolved against a scripted
//! client, and the generated output is structured by the extractors.

use quill_extract::codex::{CodexModel, HermeticCodex, Property};
use quill_extract::{tolerant_enum, ListExtractor};
use quill_llm::{LlmClient, ScriptedClient};
use quill_prompt::{Document, ResolveOptions};

tolerant_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum Mood {
        Calm ["peaceful"],
        Stormy ["rough"],
        #[default]
        NoMatch,
    }
}

#[derive(Debug, Default)]
struct Scene {
    mood: Mood,
    inhabited: bool,
    summary: String,
}

impl CodexModel for Scene {
    fn properties() -> Vec<Property<Self>> {
        vec![
            Property::enumeration("Mood", |m: &mut Scene, v: Mood| m.mood = v),
            Property::boolean("Inhabited", |m: &mut Scene, v| m.inhabited = v),
            Property::text("Summary", |m: &mut Scene, v| m.summary = v),
        ]
    }
}

const SCENE_REPLY: &str = "Here is the scene.\n\n## Mood\nrough\n\n## Inhabited\nyes\n\n## Summary\nA keeper watches the waves.\n";

#[tokio::test]
async fn resolve_then_bind_sections() {
    let client = ScriptedClient::new()
        .when("List three supplies", "1. Oil\n2. Wicks\n3. Bread")
        .when("Describe the scene", SCENE_REPLY);

    let mut doc = Document::parse(
        "<Prompt>Plan a lighthouse story</Prompt>\n\
         <Resolve Prompt=\"List three supplies the keeper needs.\">Supplies: </Resolve>\n\
         <Resolve Prompt=\"Describe the scene with headings.\"></Resolve>",
    )
    .unwrap();

    let outcome = doc.resolve(&client, &ResolveOptions::new("test-model")).await;
    assert!(outcome.is_success());
    assert!(doc.is_fully_resolved());

    let supplies = doc.elements()[2].as_resolve().unwrap().generated_text().unwrap();
    let items = ListExtractor::extract(supplies);
    let texts: Vec<&str> = items.iter().map(|item| item.text()).collect();
    assert_eq!(texts, vec!["Oil", "Wicks", "Bread"]);
    assert_eq!(items[2].index(), Some(3));

    let binding = HermeticCodex::<Scene>::bind(doc.generated_text().unwrap()).unwrap();
    assert!(binding.is_complete());
    assert_eq!(binding.model.mood, Mood::Stormy);
    assert!(binding.model.inhabited);
    assert_eq!(binding.model.summary, "A keeper watches the waves.");

    // The scene prompt saw the resolved supplies list.
    let requests = client.requests();
    assert!(requests[1].input.last_text().contains("Supplies: 1. Oil"));
    assert_eq!(client.provider_name(), "scripted");
}

#[tokio::test]
async fn failed_call_leaves_document_partially_resolved() {
    let client = ScriptedClient::new()
        .when("first", "done")
        .fail("500", "upstream down");

    let mut doc = Document::parse(
        "<Prompt>p</Prompt><Resolve Prompt=\"first\"/><Resolve Prompt=\"second\"/>",
    )
    .unwrap();

    let outcome = doc.resolve(&client, &ResolveOptions::new("m")).await;
    assert!(!outcome.is_success());
    assert_eq!(doc.unresolved_indices(), vec![2]);
    assert_eq!(doc.generated_text(), Some("done"));
}
