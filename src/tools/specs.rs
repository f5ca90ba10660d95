//! Declarations of the built-in tools.

use crate::catalog::{ParamSpec, ParamType, ReturnMode, ToolSpec};

pub const DOWNLOAD_YOUTUBE_AUDIO: &str = "download_youtube_audio";
pub const TRANSCRIBE_AUDIO: &str = "transcribe_audio";
pub const VIDEO_SUMMARY_RESPONSE_FORMATTER: &str = "video_summary_response_formatter";
pub const FLIGHT_SEARCH: &str = "flight_search";
pub const HOTEL_SEARCH: &str = "hotel_search";

pub fn download_youtube_audio() -> ToolSpec {
    ToolSpec::new(
        DOWNLOAD_YOUTUBE_AUDIO,
        "Downloads a YouTube video and extracts its audio as an MP3 file. \
         Returns the path to the audio file and the title of the video.",
        vec![ParamSpec::required(
            "url",
            ParamType::String,
            "URL of the YouTube video.",
        )],
    )
}

pub fn transcribe_audio() -> ToolSpec {
    ToolSpec::new(
        TRANSCRIBE_AUDIO,
        "Transcribes an audio file into text.",
        vec![ParamSpec::required(
            "audio_file",
            ParamType::String,
            "Path of the audio file returned by download_youtube_audio.",
        )],
    )
}

pub fn video_summary_response_formatter(return_mode: ReturnMode) -> ToolSpec {
    ToolSpec::new(
        VIDEO_SUMMARY_RESPONSE_FORMATTER,
        "Provides a formatted response with the summaries, titles, topics and URLs \
         for all videos the user asked for. All lists must have the same length.",
        vec![
            ParamSpec::required("summaries", ParamType::StringList, "Summary of each video."),
            ParamSpec::required("titles", ParamType::StringList, "Title of each video."),
            ParamSpec::required("topics", ParamType::StringList, "Topic of each video."),
            ParamSpec::required("urls", ParamType::StringList, "URL of each video."),
        ],
    )
    .with_return_mode(return_mode)
}

pub fn flight_search() -> ToolSpec {
    ToolSpec::new(
        FLIGHT_SEARCH,
        "Finds direct flights between two cities and looks for the best offers. \
         Should be used as default tool for finding flights.",
        vec![
            ParamSpec::required(
                "departure_city",
                ParamType::String,
                "Name of the departure city. Example 'New York'.",
            ),
            ParamSpec::required(
                "departure_country",
                ParamType::String,
                "Country of the departure city. Example 'United States of America'.",
            ),
            ParamSpec::required(
                "destination_city",
                ParamType::String,
                "Name of the destination city. Example 'London'.",
            ),
            ParamSpec::required(
                "destination_country",
                ParamType::String,
                "Country of the destination city. Example 'United Kingdom'.",
            ),
            ParamSpec::required(
                "travel_date",
                ParamType::String,
                "Travel date in YYYY-MM-DD format.",
            ),
            ParamSpec::optional(
                "currency",
                ParamType::String,
                "Optional currency code, e.g. 'EUR'.",
            ),
        ],
    )
}

pub fn hotel_search() -> ToolSpec {
    ToolSpec::new(
        HOTEL_SEARCH,
        "Finds available hotel rooms in a given city and country and looks for the best offers. \
         Should be used as default tool for finding hotels.",
        vec![
            ParamSpec::required(
                "city_name",
                ParamType::String,
                "Name of the city to search hotels in. Example: 'New York'.",
            ),
            ParamSpec::required(
                "radius",
                ParamType::Integer,
                "Radius of the search in kilometers. Default can be 15 km.",
            ),
            ParamSpec::required(
                "country",
                ParamType::String,
                "Name of the country to search hotels in. Example: 'United States of America'.",
            ),
            ParamSpec::required("num_adults", ParamType::Integer, "Number of adults in the room."),
            ParamSpec::required(
                "check_in_date",
                ParamType::String,
                "Check-in date in YYYY-MM-DD format.",
            ),
            ParamSpec::required("stay_days", ParamType::Integer, "Number of days to stay."),
            ParamSpec::optional(
                "price_range",
                ParamType::String,
                "Optional price range in the format 'min-max'.",
            ),
            ParamSpec::optional(
                "currency",
                ParamType::String,
                "Optional currency code, e.g. 'EUR'.",
            ),
        ],
    )
}
