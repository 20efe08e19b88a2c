// Prompt templates for the completion API.

use std::fmt;

use crate::bias::BiasDistribution;

pub const SYSTEM_MESSAGE: &str =
    "You are an AI that neutralizes bias in text with advanced multimodal reasoning.";

/// How biased the text is, as told to the completion model: either the
/// classifier's distribution or a level stated by the client.
#[derive(Debug, Clone, Copy)]
pub enum BiasLevel<'a> {
    Measured(&'a BiasDistribution),
    Stated(&'a str),
}

impl fmt::Display for BiasLevel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasLevel::Measured(bias) => write!(f, "{bias}"),
            BiasLevel::Stated(level) => write!(f, "{level}"),
        }
    }
}

pub fn rewrite_prompt(text: &str, level: BiasLevel<'_>, context: &str) -> String {
    format!(
        "The following text may have bias based on the given bias level ({level}).\n\
         Please rewrite it in a more neutral and objective manner while keeping the meaning intact:\n\
         \n\
         Original Text:\n\
         \"{text}\"\n\
         \n\
         Additional Context:\n\
         {context}\n\
         \n\
         Neutral Rewrite:\n"
    )
}

pub fn explain_prompt(text: &str, level: BiasLevel<'_>, context: &str) -> String {
    format!(
        "The following text may have bias based on the given bias level ({level}).\n\
         Please explain why the text is biased, in markdown, and also analyze how to correctly interpret it:\n\
         \n\
         Original Text:\n\
         \"{text}\"\n\
         \n\
         Additional Context:\n\
         {context}\n\
         \n\
         Explanation:\n"
    )
}
