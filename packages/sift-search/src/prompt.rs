use serde_json::Value;

const RELEVANCE_SYSTEM_PROMPT: &str = "You decide whether a text chunk helps answer a question. \
Answer with exactly one word: Yes if the chunk contains information relevant to the question, \
No otherwise.";

pub fn relevance_messages(question: &str, chunk: &str) -> Vec<Value> {
	let user = format!(
		"Question:\n{question}\n\nText chunk:\n{chunk}\n\n\
		Is the text chunk relevant to the question?"
	);

	vec![
		serde_json::json!({ "role": "system", "content": RELEVANCE_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_message_carries_question_and_chunk() {
		let messages = relevance_messages("Who won?", "The home team won 3-1.");
		let user = messages[1]["content"].as_str().expect("Missing user content.");

		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0]["role"], "system");
		assert!(user.contains("Who won?"));
		assert!(user.contains("The home team won 3-1."));
	}
}
