mod unit_cminus_parser;
