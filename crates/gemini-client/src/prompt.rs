//! Japanese prompt templates for suggestion generation
//!
//! The model is instructed to answer with a bare JSON array of exactly three
//! suggestions so the parser has a stable shape to extract. Job seekers and
//! career changers get a dedicated prompt tuned to application-period stress.

use suggestion::{AgeGroup, SuggestionRequest};

/// JSON shape the model is told to produce. Kept identical across prompts so
/// parsing does not depend on which template was used.
const FORMAT_INSTRUCTIONS: &str = r#"【重要】
必ず以下のJSON形式で、3つの提案を配列として返してください。他の説明文は不要です：

[
  {
    "title": "提案のタイトル（20文字以内）",
    "description": "簡潔な説明（50文字以内）",
    "category": "認知的",
    "steps": ["ステップ1", "ステップ2", "ステップ3", "ステップ4", "ステップ5"]
  },
  {
    "title": "提案のタイトル",
    "description": "簡潔な説明",
    "category": "行動的",
    "steps": ["ステップ1", "ステップ2", "ステップ3", "ステップ4", "ステップ5"]
  },
  {
    "title": "提案のタイトル",
    "description": "簡潔な説明",
    "category": "認知的または行動的",
    "steps": ["ステップ1", "ステップ2", "ステップ3", "ステップ4", "ステップ5"]
  }
]"#;

/// Build the generation prompt for a request.
pub fn build(request: &SuggestionRequest) -> String {
    let minutes = request.duration.minutes();

    let job_hunting = request.age_group.is_some_and(|g| g.is_job_hunting())
        || request.situation == suggestion::Situation::JobHunting;
    if job_hunting {
        return job_hunting_prompt(minutes);
    }

    let location = request.situation.label_ja();
    let target = request
        .age_group
        .as_ref()
        .map(AgeGroup::label_ja)
        .unwrap_or("20-40代の社会人");

    format!(
        r#"あなたは日常のストレス解消と気晴らしの専門家です。
以下の条件で、実践しやすく効果的な気晴らし方法を3つ提案してください。

【条件】
- 場所: {location}
- 時間: {minutes}分
- 対象: {target}
- 状況: 仕事や人間関係の疲れ、気分の落ち込みを感じている

【提案のガイドライン】
1. 認知的気晴らし（頭の中で行う）と行動的気晴らし（具体的な行動を伴う）をバランスよく含める
2. {minutes}分で完結できる現実的な内容にする
3. 特別な道具や準備が不要なものを優先する
4. ストレス解消効果が期待できる科学的根拠があるものが望ましい

{format}"#,
        location = location,
        minutes = minutes,
        target = target,
        format = FORMAT_INSTRUCTIONS,
    )
}

/// Dedicated prompt for the job-hunting audience.
fn job_hunting_prompt(minutes: u32) -> String {
    format!(
        r#"あなたは就職・転職活動のストレスケア専門家です。
以下の条件で、就活・転職活動中の方向けの気晴らし方法を3つ提案してください。

【条件】
- 時間: {minutes}分
- 対象: 就職・転職活動中でストレスを感じている方
- 想定される状況:
  - 面接前の緊張
  - 不採用通知後の落ち込み
  - 書類作成の疲れ
  - 長期化による焦りや不安

【提案のガイドライン】
1. 就活・転職活動特有のストレスに効果的な方法
2. 自己肯定感を高める要素を含む
3. 次の活動へのモチベーションにつながる
4. どこでも実践できる内容

{format}"#,
        minutes = minutes,
        format = FORMAT_INSTRUCTIONS,
    )
}
