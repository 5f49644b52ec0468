mod helpers;
mod jobs;
mod webhooks;
