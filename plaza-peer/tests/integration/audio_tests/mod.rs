mod test_voice_level_reaches_host;
