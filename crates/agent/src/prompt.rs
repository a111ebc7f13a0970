//! Prompt text for the mention-reply agent.

pub const SLACK_CONVERSATION_SEARCH_NAME: &str = "Slack Conversation Search";

pub const SLACK_CONVERSATION_SEARCH_DESCRIPTION: &str = "A tool for referencing information \
    from past conversations outside the current thread. Useful for when an answer may be in \
    previous discussions, attached files, or unfurling links. Avoid mentioning that you used \
    this tool in the final answer. Present the information as if it were organically sourced \
    instead. Input should be a question in natural language that this tool can answer.";

pub const SLACK_URL_SEARCH_NAME: &str = "Slack URL Search";

pub const SLACK_URL_SEARCH_DESCRIPTION: &str = "A tool for extracting precise information \
    from URLs that have been shared within Slack conversations. This includes unfurling \
    links, attached files, or even other messages that have been referenced in Slack \
    messages. Useful for when you need to retrieve detailed data from a specific URL \
    previously mentioned in a conversation. Input should be a URL (i.e. \
    https://www.example.com).";

pub const FINAL_ANSWER_ACTION: &str = "Final Answer";

/// The opening system message. The trailing heading introduces the replayed
/// thread history that follows it in the conversation.
pub fn system_message(bot_id: &str, channel_id: &str, time_message: &str, context: &str) -> String {
    format!(
        "Assistant is a Slack bot with ID {bot_id}, operating in channel {channel_id}, \
         responding within a specific thread.\n\n\
         Mention users as <@USER_ID> and link channels as <#CHANNEL_ID> in Slack mrkdwn \
         format. {time_message}\n\n\
         Always include permalinks in the final answer when available and adhere to \
         user-defined context.\n\n\
         USER-DEFINED CONTEXT\n\
         ====================\n\
         {context}\n\n\
         CONVERSATIONS IN THE CURRENT THREADS\n\
         ===================================="
    )
}

/// The closing user turn: tool list, response format, and the actual input.
pub fn tools_message(input: &str) -> String {
    format!(
        "TOOLS\n\
         -----\n\
         Assistant can provide an answer based on the given inputs. However, if needed, the \
         human can use tools to look up additional information that may be helpful in \
         answering the user's original question. The tools the human can use are:\n\n\
         > {SLACK_CONVERSATION_SEARCH_NAME}: {SLACK_CONVERSATION_SEARCH_DESCRIPTION}\n\
         > {SLACK_URL_SEARCH_NAME}: {SLACK_URL_SEARCH_DESCRIPTION}\n\n\
         RESPONSE FORMAT\n\
         ---------------\n\
         Respond with a markdown code snippet of a json blob with a single action:\n\n\
         ```json\n\
         {{\n    \"action\": string, // \"{SLACK_CONVERSATION_SEARCH_NAME}\", \
         \"{SLACK_URL_SEARCH_NAME}\" or \"{FINAL_ANSWER_ACTION}\"\n    \
         \"action_input\": string // the input to the action\n\
         }}\n\
         ```\n\n\
         LAST USER'S INPUT\n\
         -----------------\n\
         Here is the user's last input (remember to respond with a markdown code snippet of \
         a json blob with a single action, and NOTHING else):\n\n\
         {input}"
    )
}

/// Per-document extraction prompt for the conversation search tool.
pub fn question_message(portion: &str) -> String {
    format!(
        "Use the following portion of a long document to see if any of the text is relevant \
         to answer the question.\n\
         Return any relevant text verbatim.\n\
         When providing your answer, consider the timestamp, channel, user, and page which \
         may not align with the original document.\n\
         Always include the permalink in your response.\n\
         ----------------\n\
         {portion}"
    )
}

/// Reduce prompt that folds the per-document extracts into one answer.
pub fn combine_message(summaries: &str) -> String {
    format!(
        "Given the following extracted parts of a long document and a question, create a \
         final answer.\n\
         Consider the timestamp, channel and user when providing your answer.\n\
         Always include the permalink in your response.\n\
         If you don't know the answer, just say that you don't know. Don't try to make up an \
         answer.\n\
         ______________________\n\
         {summaries}"
    )
}
